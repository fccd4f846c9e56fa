//! Source jobs: one per data source, each writing into the shared registry.

pub mod assets;
pub mod blobstores;
pub mod entitlement;
pub mod status;

use crate::error::ExporterError;
use crate::registry::MetricRegistry;
use async_trait::async_trait;
use std::time::Duration;

pub use assets::AssetsJob;
pub use blobstores::BlobstoresJob;
pub use entitlement::EntitlementJob;
pub use status::StatusJob;

#[async_trait]
pub trait SourceJob: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Registers help text for every metric the job writes.
    fn describe(&self, registry: &MetricRegistry);

    /// Runs one cycle. Whatever could be computed is already published by
    /// the time this returns, failed or not.
    async fn run(&self, registry: &MetricRegistry) -> CycleReport;
}

/// Outcome of one job cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub soft_errors: u64,
    pub failure: Option<ExporterError>,
}

impl CycleReport {
    pub fn success(soft_errors: u64) -> Self {
        Self {
            soft_errors,
            failure: None,
        }
    }

    pub fn failed(soft_errors: u64, error: ExporterError) -> Self {
        Self {
            soft_errors,
            failure: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
