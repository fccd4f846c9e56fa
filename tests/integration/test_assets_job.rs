//! Asset walks across repositories, including mid-walk failures

use crate::fixtures::FakeNexus;
use nexus_exporter::error::ExporterError;
use nexus_exporter::jobs::assets::{
    REPOSITORIES_COUNT, REPOSITORY_ASSETS, REPOSITORY_AVERAGE_AGE, REPOSITORY_LAST_MODIFIED,
    REPOSITORY_SIZE,
};
use nexus_exporter::jobs::{AssetsJob, SourceJob};
use nexus_exporter::registry::MetricRegistry;
use nexus_exporter::types::{labels, Labels};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn repo(name: &str) -> Labels {
    labels([("repository", name)])
}

fn job(fake: FakeNexus, max_pages: Option<usize>) -> (AssetsJob, Arc<FakeNexus>) {
    let fake = Arc::new(fake);
    let job = AssetsJob::new(fake.clone(), Duration::from_secs(60), max_pages);
    (job, fake)
}

#[tokio::test]
async fn test_two_pages_sum_to_repository_size() {
    let (job, fake) = job(
        FakeNexus::default().with_repository(
            "maven-releases",
            vec![
                Some(vec![json!({"fileSize": 100}), json!({"fileSize": 200})]),
                Some(vec![json!({"fileSize": 50})]),
            ],
        ),
        None,
    );
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(fake.calls_for("maven-releases"), 2);
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("maven-releases")), Some(350.0));
    assert_eq!(registry.get(REPOSITORY_ASSETS, &repo("maven-releases")), Some(3.0));
    assert_eq!(registry.get(REPOSITORIES_COUNT, &Labels::new()), Some(1.0));
}

#[tokio::test]
async fn test_empty_intermediate_pages_do_not_stop_walk() {
    let (job, fake) = job(
        FakeNexus::default().with_repository(
            "npm-proxy",
            vec![
                Some(vec![json!({"fileSize": 1})]),
                Some(vec![]),
                Some(vec![]),
                Some(vec![json!({"fileSize": 2})]),
            ],
        ),
        None,
    );
    let registry = MetricRegistry::new();

    job.run(&registry).await;

    assert_eq!(fake.calls_for("npm-proxy"), 4);
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("npm-proxy")), Some(3.0));
}

#[tokio::test]
async fn test_failure_after_first_page_publishes_partial() {
    let (job, fake) = job(
        FakeNexus::default()
            .with_repository(
                "flaky",
                vec![
                    Some(vec![json!({"fileSize": 10})]),
                    Some(vec![json!({"fileSize": 20})]),
                    None,
                    Some(vec![json!({"fileSize": 40})]),
                ],
            )
            .with_repository("healthy", vec![Some(vec![json!({"fileSize": 7})])]),
        None,
    );
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(matches!(
        report.failure,
        Some(ExporterError::Incomplete { failed: 1, total: 2 })
    ));
    assert_eq!(fake.calls_for("flaky"), 3);
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("flaky")), Some(30.0));
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("healthy")), Some(7.0));
}

#[tokio::test]
async fn test_failure_on_first_page_keeps_previous_value() {
    let registry = MetricRegistry::new();
    registry.set(REPOSITORY_SIZE, repo("down"), 123.0);

    let (job, _fake) = job(FakeNexus::default().with_repository("down", vec![None]), None);
    let report = job.run(&registry).await;

    assert!(!report.is_success());
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("down")), Some(123.0));
    assert_eq!(registry.get(REPOSITORY_ASSETS, &repo("down")), None);
}

#[tokio::test]
async fn test_repository_list_failure_publishes_nothing() {
    let (job, _fake) = job(FakeNexus::default(), None);
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(matches!(report.failure, Some(ExporterError::Status { .. })));
    assert_eq!(registry.get_all().count(), 0);
}

#[tokio::test]
async fn test_page_limit_truncates_and_publishes() {
    let pages = (0..10).map(|_| Some(vec![json!({"fileSize": 5})])).collect();
    let (job, fake) = job(FakeNexus::default().with_repository("huge", pages), Some(3));
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(!report.is_success());
    assert_eq!(fake.calls_for("huge"), 3);
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("huge")), Some(15.0));
}

#[tokio::test]
async fn test_empty_repository_reports_zeros() {
    let (job, _fake) = job(FakeNexus::default().with_repository("empty", vec![Some(vec![])]), None);
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(registry.get(REPOSITORY_SIZE, &repo("empty")), Some(0.0));
    assert_eq!(registry.get(REPOSITORY_AVERAGE_AGE, &repo("empty")), Some(0.0));
    assert_eq!(registry.get(REPOSITORY_LAST_MODIFIED, &repo("empty")), Some(0.0));
}

#[tokio::test]
async fn test_timestamps_feed_latest_and_age() {
    let (job, _fake) = job(
        FakeNexus::default().with_repository(
            "docker",
            vec![Some(vec![
                json!({"fileSize": 1, "lastModified": "2024-01-01T00:00:00.000+00:00", "lastDownloaded": "2000-01-01T00:00:00Z"}),
                json!({"fileSize": 1, "lastModified": "2024-02-01T00:00:00Z", "lastDownloaded": null}),
                json!({"fileSize": 1, "lastModified": "garbage"}),
            ])],
        ),
        None,
    );
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert_eq!(report.soft_errors, 1);
    assert_eq!(
        registry.get(REPOSITORY_LAST_MODIFIED, &repo("docker")),
        Some(1_706_745_600.0)
    );
    let age = registry.get(REPOSITORY_AVERAGE_AGE, &repo("docker")).unwrap();
    assert!(age > 365.0 * 20.0);
}

#[tokio::test]
async fn test_nameless_repositories_are_skipped() {
    let mut fake = FakeNexus::default().with_repository("named", vec![Some(vec![])]);
    fake.repositories
        .as_mut()
        .unwrap()
        .extend([json!({"format": "maven2"}), json!({"name": ""})]);
    let (job, _fake) = job(fake, None);
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(registry.get(REPOSITORIES_COUNT, &Labels::new()), Some(1.0));
}
