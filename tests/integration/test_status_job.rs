use crate::fixtures::FakeNexus;
use nexus_exporter::jobs::status::{CHECK_HEALTHY, UNHEALTHY_COUNT};
use nexus_exporter::jobs::{SourceJob, StatusJob};
use nexus_exporter::registry::MetricRegistry;
use nexus_exporter::server;
use nexus_exporter::types::{labels, Labels};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_status_checks_become_indicators() {
    let checks = json!({
        "Available CPUs": {"healthy": true, "message": "ok"},
        "Blob Stores Quota": {"healthy": false, "message": "over quota"}
    });
    let fake = FakeNexus {
        checks: checks.as_object().cloned(),
        ..Default::default()
    };
    let job = StatusJob::new(Arc::new(fake), Duration::from_secs(30));
    let registry = MetricRegistry::new();

    let report = job.run(&registry).await;

    assert!(report.is_success());
    assert_eq!(
        registry.get(CHECK_HEALTHY, &labels([("check", "Available CPUs")])),
        Some(1.0)
    );
    assert_eq!(
        registry.get(CHECK_HEALTHY, &labels([("check", "Blob Stores Quota")])),
        Some(0.0)
    );
    assert_eq!(registry.get(UNHEALTHY_COUNT, &Labels::new()), Some(1.0));

    job.describe(&registry);
    let text = server::encode(&registry).unwrap();
    assert!(text.contains("# TYPE nexus_status_check_healthy gauge\n"));
    assert!(text.contains("nexus_status_check_healthy{check=\"Available CPUs\"} 1\n"));
}
