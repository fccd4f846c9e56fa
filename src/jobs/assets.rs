//! Repository size and asset statistics, walked page by page from the asset search.

use super::{CycleReport, SourceJob};
use crate::aggregate::{Accumulator, Observation, Summary};
use crate::client::NexusApi;
use crate::error::{ExporterError, Result};
use crate::extract::FieldExtractor;
use crate::registry::MetricRegistry;
use crate::types::{labels, Page};
use crate::walker::walk;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const REPOSITORIES_COUNT: &str = "nexus_repositories_count";
pub const REPOSITORY_SIZE: &str = "nexus_repositories_size_bytes";
pub const REPOSITORY_ASSETS: &str = "nexus_repositories_assets_count";
pub const REPOSITORY_LAST_MODIFIED: &str = "nexus_repositories_last_modified_timestamp_seconds";
pub const REPOSITORY_AVERAGE_AGE: &str = "nexus_repositories_average_age_days";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct AssetsJob {
    api: Arc<dyn NexusApi>,
    interval: Duration,
    max_pages: Option<usize>,
}

impl AssetsJob {
    pub fn new(api: Arc<dyn NexusApi>, interval: Duration, max_pages: Option<usize>) -> Self {
        Self {
            api,
            interval,
            max_pages,
        }
    }
}

/// Result of walking one repository's assets.
#[derive(Debug)]
pub struct RepositoryWalk {
    pub pages: usize,
    pub accumulator: Accumulator,
    pub error: Option<ExporterError>,
}

impl RepositoryWalk {
    /// Partial aggregates are worth publishing once at least one page made it.
    pub fn publishable(&self) -> bool {
        self.pages > 0
    }
}

/// Walks every page of one repository into a fresh accumulator.
pub async fn walk_repository<F, Fut>(
    repository: &str,
    fetch_page: F,
    max_pages: Option<usize>,
    extractor: &mut FieldExtractor,
    now: DateTime<Utc>,
) -> RepositoryWalk
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let mut accumulator = Accumulator::new(now);
    let mut pages = 0;

    let stream = walk(fetch_page, max_pages);
    futures::pin_mut!(stream);

    while let Some(next) = stream.next().await {
        let page = match next {
            Ok(page) => page,
            Err(e) => {
                return RepositoryWalk {
                    pages,
                    accumulator,
                    error: Some(e),
                }
            }
        };
        pages += 1;

        let size_before = accumulator.total_size;
        for item in &page.items {
            accumulator.absorb(&Observation {
                size_bytes: extractor.u64_field(item, "fileSize", 0),
                modified: extractor.timestamp_field(item, "lastModified"),
                last_event: extractor.timestamp_field(item, "lastDownloaded"),
                category: None,
            });
        }
        debug!(
            "[{}] Page {}: {} assets, {} bytes",
            repository,
            pages,
            page.items.len(),
            accumulator.total_size - size_before
        );
    }

    RepositoryWalk {
        pages,
        accumulator,
        error: None,
    }
}

pub fn publish_repository(registry: &MetricRegistry, repository: &str, summary: &Summary) {
    let series = labels([("repository", repository)]);
    registry.set(REPOSITORY_SIZE, series.clone(), summary.total_size as f64);
    registry.set(REPOSITORY_ASSETS, series.clone(), summary.total_count as f64);
    registry.set(
        REPOSITORY_LAST_MODIFIED,
        series.clone(),
        summary.latest_epoch_seconds(),
    );
    registry.set(REPOSITORY_AVERAGE_AGE, series, summary.average_age_days);
}

#[async_trait]
impl SourceJob for AssetsJob {
    fn name(&self) -> &'static str {
        "assets"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn describe(&self, registry: &MetricRegistry) {
        registry.describe(REPOSITORIES_COUNT, "Total number of repositories", &[]);
        registry.describe(REPOSITORY_SIZE, "Total size of repository in bytes", &["repository"]);
        registry.describe(REPOSITORY_ASSETS, "Total number of assets in repository", &["repository"]);
        registry.describe(
            REPOSITORY_LAST_MODIFIED,
            "Latest asset modification time (epoch seconds), 0 if unknown",
            &["repository"],
        );
        registry.describe(
            REPOSITORY_AVERAGE_AGE,
            "Average days since assets were last downloaded",
            &["repository"],
        );
    }

    async fn run(&self, registry: &MetricRegistry) -> CycleReport {
        let mut extractor = FieldExtractor::new();

        let repositories = match self.api.list_repositories().await {
            Ok(repositories) => repositories,
            Err(e) => {
                error!("Error fetching repository list: {}", e);
                return CycleReport::failed(0, e);
            }
        };

        let names: Vec<String> = repositories
            .iter()
            .filter_map(|repo| extractor.str_field(repo, "name"))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        registry.set_unlabelled(REPOSITORIES_COUNT, names.len() as f64);

        let now = Utc::now();
        let api = self.api.as_ref();
        let mut failed = 0;

        for name in &names {
            info!("Processing repository: {}", name);
            let name = name.as_str();
            let result = walk_repository(
                name,
                move |cursor| api.search_assets(name, cursor),
                self.max_pages,
                &mut extractor,
                now,
            )
            .await;

            let summary = result.accumulator.finalize();
            match (&result.error, result.publishable()) {
                (None, _) => {
                    info!(
                        "Repository {} size: {} bytes ({:.2} GB), assets count: {}",
                        name,
                        summary.total_size,
                        summary.total_size as f64 / BYTES_PER_GB,
                        summary.total_count
                    );
                    publish_repository(registry, name, &summary);
                }
                (Some(e), true) => {
                    failed += 1;
                    warn!(
                        "Repository {} walk stopped after {} pages ({}), publishing partial size {} bytes",
                        name, result.pages, e, summary.total_size
                    );
                    publish_repository(registry, name, &summary);
                }
                (Some(e), false) => {
                    failed += 1;
                    error!("Error fetching assets for repository {}: {}", name, e);
                }
            }
        }

        let soft_errors = extractor.soft_errors();
        if failed > 0 {
            CycleReport::failed(
                soft_errors,
                ExporterError::Incomplete {
                    failed,
                    total: names.len(),
                },
            )
        } else {
            CycleReport::success(soft_errors)
        }
    }
}
