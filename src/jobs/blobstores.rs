use super::{CycleReport, SourceJob};
use crate::aggregate::usage_percent;
use crate::client::NexusApi;
use crate::extract::FieldExtractor;
use crate::registry::MetricRegistry;
use crate::types::labels;
use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const BLOBSTORES_COUNT: &str = "nexus_blobstores_count";
pub const BLOBSTORE_SIZE: &str = "nexus_blobstores_size_bytes";
pub const BLOBSTORE_USED: &str = "nexus_blobstores_used_space_bytes";
pub const BLOBSTORE_USAGE: &str = "nexus_blobstores_usage_percent";
pub const BLOBSTORE_FILES: &str = "nexus_blobstores_file_count";

pub struct BlobstoresJob {
    api: Arc<dyn NexusApi>,
    interval: Duration,
}

impl BlobstoresJob {
    pub fn new(api: Arc<dyn NexusApi>, interval: Duration) -> Self {
        Self { api, interval }
    }
}

/// Publishes one blobstore entry; entries without a name are skipped.
pub fn publish_blobstore(registry: &MetricRegistry, extractor: &mut FieldExtractor, blob: &Value) -> bool {
    let Some(name) = extractor.str_field(blob, "name").filter(|n| !n.is_empty()) else {
        return false;
    };
    let used = extractor.u64_field(blob, "totalSizeInBytes", 0);
    let available = extractor.u64_field(blob, "availableSpaceInBytes", 0);
    let blob_count = extractor.u64_field(blob, "blobCount", 0);
    let full = used.saturating_add(available);

    let series = labels([("name", name)]);
    registry.set(BLOBSTORE_SIZE, series.clone(), full as f64);
    registry.set(BLOBSTORE_USED, series.clone(), used as f64);
    registry.set(BLOBSTORE_USAGE, series.clone(), usage_percent(used, available));
    registry.set(BLOBSTORE_FILES, series, blob_count as f64);
    true
}

#[async_trait]
impl SourceJob for BlobstoresJob {
    fn name(&self) -> &'static str {
        "blobstores"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn describe(&self, registry: &MetricRegistry) {
        registry.describe(BLOBSTORES_COUNT, "Total number of blobstores", &[]);
        registry.describe(BLOBSTORE_SIZE, "Size of blobstore in bytes", &["name"]);
        registry.describe(BLOBSTORE_USED, "Used space of blobstore in bytes", &["name"]);
        registry.describe(BLOBSTORE_USAGE, "Usage of blobstore in percent", &["name"]);
        registry.describe(BLOBSTORE_FILES, "Number of files stored in each blobstore", &["name"]);
    }

    async fn run(&self, registry: &MetricRegistry) -> CycleReport {
        let blobstores = match self.api.list_blobstores().await {
            Ok(blobstores) => blobstores,
            Err(e) => {
                error!("Failed to fetch blobstores: {}", e);
                return CycleReport::failed(0, e);
            }
        };

        let mut extractor = FieldExtractor::new();
        registry.set_unlabelled(BLOBSTORES_COUNT, blobstores.len() as f64);
        let published = blobstores
            .iter()
            .filter(|blob| publish_blobstore(registry, &mut extractor, blob))
            .count();

        info!("Updated {} of {} blobstores", published, blobstores.len());
        CycleReport::success(extractor.soft_errors())
    }
}
