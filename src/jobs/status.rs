use super::{CycleReport, SourceJob};
use crate::aggregate::indicator;
use crate::client::NexusApi;
use crate::extract::FieldExtractor;
use crate::registry::MetricRegistry;
use crate::types::labels;
use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const CHECK_HEALTHY: &str = "nexus_status_check_healthy";
pub const CHECKS_COUNT: &str = "nexus_status_checks_count";
pub const UNHEALTHY_COUNT: &str = "nexus_status_unhealthy_count";

pub struct StatusJob {
    api: Arc<dyn NexusApi>,
    interval: Duration,
}

impl StatusJob {
    pub fn new(api: Arc<dyn NexusApi>, interval: Duration) -> Self {
        Self { api, interval }
    }
}

/// Publishes every component check and returns the number of unhealthy ones.
pub fn publish_checks(
    registry: &MetricRegistry,
    extractor: &mut FieldExtractor,
    checks: &Map<String, Value>,
) -> usize {
    let mut unhealthy = 0;
    for (component, check) in checks {
        let healthy = extractor.bool_field(check, "healthy", false);
        if !healthy {
            unhealthy += 1;
            warn!("Status check {} is unhealthy", component);
        }
        registry.set(
            CHECK_HEALTHY,
            labels([("check", component.as_str())]),
            indicator(healthy),
        );
    }
    registry.set_unlabelled(CHECKS_COUNT, checks.len() as f64);
    registry.set_unlabelled(UNHEALTHY_COUNT, unhealthy as f64);
    unhealthy
}

#[async_trait]
impl SourceJob for StatusJob {
    fn name(&self) -> &'static str {
        "status"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn describe(&self, registry: &MetricRegistry) {
        registry.describe(CHECK_HEALTHY, "1 if the status check reports healthy, else 0", &["check"]);
        registry.describe(CHECKS_COUNT, "Number of status checks reported", &[]);
        registry.describe(UNHEALTHY_COUNT, "Number of unhealthy status checks", &[]);
    }

    async fn run(&self, registry: &MetricRegistry) -> CycleReport {
        let checks = match self.api.status_checks().await {
            Ok(checks) => checks,
            Err(e) => {
                error!("Failed to fetch status checks: {}", e);
                return CycleReport::failed(0, e);
            }
        };

        let mut extractor = FieldExtractor::new();
        let unhealthy = publish_checks(registry, &mut extractor, &checks);
        info!("Status checks: {} total, {} unhealthy", checks.len(), unhealthy);
        CycleReport::success(extractor.soft_errors())
    }
}
