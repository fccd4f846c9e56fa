//! Certificate entitlement directory scan.
//!
//! Lists the immediate entries of one directory (no recursion) and classifies
//! regular files by suffix into `.pem`, `.p12`, or untracked.

use super::{CycleReport, SourceJob};
use crate::aggregate::{display_timestamp, indicator, Accumulator, Observation, Summary};
use crate::error::{ExporterError, Result};
use crate::registry::MetricRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PEM_COUNT: &str = "entitlement_pem_file_count";
pub const P12_COUNT: &str = "entitlement_p12_file_count";
pub const TOTAL_SIZE: &str = "entitlement_total_file_size_bytes";
pub const LAST_MODIFIED: &str = "entitlement_last_modified_epoch";
pub const PEM_MORE_THAN_P12: &str = "entitlement_pem_more_than_p12";
pub const PEM_NEWER_THAN_P12: &str = "entitlement_pem_newer_than_p12";

const PEM: &str = "pem";
const P12: &str = "p12";

pub struct EntitlementJob {
    dir: PathBuf,
    interval: Duration,
    timeout: Duration,
}

impl EntitlementJob {
    pub fn new(dir: PathBuf, interval: Duration, timeout: Duration) -> Self {
        Self {
            dir,
            interval,
            timeout,
        }
    }
}

/// Directory scan result: the accumulator plus entries that could not be stat'ed.
#[derive(Debug)]
pub struct Scan {
    pub accumulator: Accumulator,
    pub skipped: u64,
}

fn classify(file_name: &str) -> Option<&'static str> {
    if file_name.ends_with(".pem") {
        Some(PEM)
    } else if file_name.ends_with(".p12") {
        Some(P12)
    } else {
        None
    }
}

pub async fn scan_directory(dir: &Path, now: DateTime<Utc>) -> Result<Scan> {
    let fs_error = |source: std::io::Error| ExporterError::Filesystem {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(fs_error)?;
    let mut accumulator = Accumulator::with_categories(now, &[PEM, P12]);
    let mut skipped = 0;

    while let Some(entry) = entries.next_entry().await.map_err(fs_error)? {
        let path = entry.path();
        // Follows symlinks, so a link to a certificate counts as a file.
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        accumulator.absorb(&Observation {
            size_bytes: metadata.len(),
            modified,
            last_event: None,
            category: file_name.to_str().and_then(classify),
        });
    }

    Ok(Scan {
        accumulator,
        skipped,
    })
}

pub fn publish_summary(registry: &MetricRegistry, summary: &Summary) {
    let pem = summary.category(PEM);
    let p12 = summary.category(P12);

    registry.set_unlabelled(PEM_COUNT, pem.count as f64);
    registry.set_unlabelled(P12_COUNT, p12.count as f64);
    registry.set_unlabelled(TOTAL_SIZE, summary.total_size as f64);
    registry.set_unlabelled(LAST_MODIFIED, summary.latest_epoch_seconds());
    registry.set_unlabelled(PEM_MORE_THAN_P12, indicator(pem.count > p12.count));
    registry.set_unlabelled(PEM_NEWER_THAN_P12, indicator(pem.latest > p12.latest));

    info!(
        "Last modified: {} | PEM: {} (latest: {}) | P12: {} (latest: {}) | Size: {} bytes",
        summary.latest_display(),
        pem.count,
        display_timestamp(pem.latest),
        p12.count,
        display_timestamp(p12.latest),
        summary.total_size
    );
}

#[async_trait]
impl SourceJob for EntitlementJob {
    fn name(&self) -> &'static str {
        "entitlement"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn describe(&self, registry: &MetricRegistry) {
        registry.describe(PEM_COUNT, "Number of .pem files in entitlement directory", &[]);
        registry.describe(P12_COUNT, "Number of .p12 files in entitlement directory", &[]);
        registry.describe(TOTAL_SIZE, "Total size of all files in bytes", &[]);
        registry.describe(LAST_MODIFIED, "Latest modification time (epoch seconds, UTC)", &[]);
        registry.describe(PEM_MORE_THAN_P12, "1 if .pem files > .p12 files, else 0", &[]);
        registry.describe(
            PEM_NEWER_THAN_P12,
            "1 if newest .pem is newer than newest .p12, else 0",
            &[],
        );
    }

    async fn run(&self, registry: &MetricRegistry) -> CycleReport {
        let scan = match tokio::time::timeout(self.timeout, scan_directory(&self.dir, Utc::now())).await {
            Ok(Ok(scan)) => scan,
            Ok(Err(e)) => {
                error!("Error scanning directory: {}", e);
                return CycleReport::failed(0, e);
            }
            Err(_) => {
                let e = ExporterError::Timeout(self.timeout);
                error!("Error scanning directory {}: {}", self.dir.display(), e);
                return CycleReport::failed(0, e);
            }
        };

        publish_summary(registry, &scan.accumulator.finalize());
        CycleReport::success(scan.skipped)
    }
}
