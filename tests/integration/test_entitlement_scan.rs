//! Entitlement directory scans against real temporary directories

use chrono::Utc;
use nexus_exporter::jobs::entitlement::{
    scan_directory, LAST_MODIFIED, P12_COUNT, PEM_COUNT, PEM_MORE_THAN_P12, PEM_NEWER_THAN_P12,
    TOTAL_SIZE,
};
use nexus_exporter::jobs::{EntitlementJob, SourceJob};
use nexus_exporter::registry::MetricRegistry;
use nexus_exporter::types::Labels;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

fn write_file(dir: &Path, name: &str, bytes: usize, mtime_secs: u64) -> std::io::Result<()> {
    let mut file = fs::File::create(dir.join(name))?;
    file.write_all(&vec![b'x'; bytes])?;
    file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime_secs))?;
    Ok(())
}

fn value(registry: &MetricRegistry, name: &str) -> Option<f64> {
    registry.get(name, &Labels::new())
}

#[tokio::test]
async fn test_newest_file_is_p12() {
    let temp = tempfile::tempdir().unwrap();
    write_file(temp.path(), "a.pem", 10, 1_700_000_000).unwrap();
    write_file(temp.path(), "b.pem", 20, 1_700_000_100).unwrap();
    write_file(temp.path(), "c.p12", 30, 1_700_000_200).unwrap();

    let job = EntitlementJob::new(
        temp.path().to_path_buf(),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );
    let registry = MetricRegistry::new();
    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(value(&registry, PEM_COUNT), Some(2.0));
    assert_eq!(value(&registry, P12_COUNT), Some(1.0));
    assert_eq!(value(&registry, TOTAL_SIZE), Some(60.0));
    assert_eq!(value(&registry, LAST_MODIFIED), Some(1_700_000_200.0));
    assert_eq!(value(&registry, PEM_MORE_THAN_P12), Some(1.0));
    assert_eq!(value(&registry, PEM_NEWER_THAN_P12), Some(0.0));
}

#[tokio::test]
async fn test_untracked_files_count_toward_size_only() {
    let temp = tempfile::tempdir().unwrap();
    write_file(temp.path(), "x.p12", 5, 1_600_000_000).unwrap();
    write_file(temp.path(), "notes.txt", 7, 1_600_000_500).unwrap();
    fs::create_dir(temp.path().join("nested.pem")).unwrap();
    write_file(&temp.path().join("nested.pem"), "deep.pem", 100, 1_600_000_900).unwrap();

    let scan = scan_directory(temp.path(), Utc::now()).await.unwrap();
    let summary = scan.accumulator.finalize();

    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.total_size, 12);
    assert_eq!(summary.category("pem").count, 0);
    assert_eq!(summary.category("p12").count, 1);
    assert_eq!(summary.latest_epoch_seconds(), 1_600_000_500.0);
}

#[tokio::test]
async fn test_empty_directory_reports_zeros() {
    let temp = tempfile::tempdir().unwrap();
    let job = EntitlementJob::new(
        temp.path().to_path_buf(),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(value(&registry, PEM_COUNT), Some(0.0));
    assert_eq!(value(&registry, LAST_MODIFIED), Some(0.0));
    assert_eq!(value(&registry, PEM_NEWER_THAN_P12), Some(0.0));
}

#[tokio::test]
async fn test_missing_directory_fails_cycle_only() {
    let temp = tempfile::tempdir().unwrap();
    let registry = MetricRegistry::new();
    registry.set(PEM_COUNT, Labels::new(), 4.0);

    let job = EntitlementJob::new(
        temp.path().join("absent"),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );
    let report = job.run(&registry).await;

    assert!(matches!(
        report.failure,
        Some(nexus_exporter::ExporterError::Filesystem { .. })
    ));
    assert_eq!(value(&registry, PEM_COUNT), Some(4.0));
}
