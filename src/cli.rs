use crate::client::Credentials;
use crate::error::ExporterError;
use crate::types::JobKind;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the Nexus repository manager
    #[arg(long, env = "NEXUS_URL")]
    pub nexus_url: Option<String>,

    /// Nexus user for basic authentication
    #[arg(long, env = "NEXUS_USER")]
    pub nexus_user: Option<String>,

    /// Nexus password for basic authentication
    #[arg(long, env = "NEXUS_PASS", hide_env_values = true)]
    pub nexus_pass: Option<String>,

    /// Address serving /metrics
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9103")]
    pub listen: SocketAddr,

    /// Seconds between repository asset walks
    #[arg(long, env = "SCRAPE_INTERVAL", default_value = "60")]
    pub scrape_interval: u64,

    /// Seconds between blobstore polls
    #[arg(long, env = "BLOBSTORE_INTERVAL", default_value = "30")]
    pub blobstore_interval: u64,

    /// Seconds between status check polls
    #[arg(long, env = "STATUS_INTERVAL", default_value = "30")]
    pub status_interval: u64,

    /// Seconds between entitlement directory scans
    #[arg(long, env = "ENTITLEMENT_INTERVAL", default_value = "5")]
    pub entitlement_interval: u64,

    /// Directory holding entitlement certificates
    #[arg(long, env = "ENTITLEMENT_DIR", default_value = "/etc/pki/entitlement")]
    pub entitlement_dir: PathBuf,

    /// Timeout in seconds for list calls and the directory scan
    #[arg(long, env = "LIST_TIMEOUT", default_value = "10")]
    pub list_timeout: u64,

    /// Timeout in seconds for each asset search page
    #[arg(long, env = "PAGE_TIMEOUT", default_value = "30")]
    pub page_timeout: u64,

    /// Upper bound on asset pages walked per repository (optional)
    #[arg(long, env = "MAX_PAGES", default_value = None)]
    pub max_pages: Option<usize>,

    /// Source jobs to run
    #[arg(
        long,
        env = "EXPORTER_JOBS",
        value_enum,
        value_delimiter = ',',
        default_values = ["assets", "blobstores", "status", "entitlement"]
    )]
    pub jobs: Vec<JobKind>,
}

#[derive(Debug, Clone)]
pub struct NexusSettings {
    pub base_url: String,
    pub credentials: Credentials,
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub nexus: Option<NexusSettings>,
    pub listen: SocketAddr,
    pub jobs: Vec<(JobKind, Duration)>,
    pub entitlement_dir: PathBuf,
    pub list_timeout: Duration,
    pub page_timeout: Duration,
    pub max_pages: Option<usize>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn seconds(name: &str, value: u64) -> Result<Duration, ExporterError> {
    if value == 0 {
        return Err(ExporterError::Config(format!("{} must be positive", name)));
    }
    Ok(Duration::from_secs(value))
}

impl Cli {
    pub fn validate(&self) -> Result<Settings, ExporterError> {
        let mut kinds = self.jobs.clone();
        kinds.sort();
        kinds.dedup();
        if kinds.is_empty() {
            return Err(ExporterError::Config("no jobs selected".to_string()));
        }

        let nexus = if kinds.iter().any(JobKind::needs_nexus) {
            match (
                non_empty(&self.nexus_url),
                non_empty(&self.nexus_user),
                non_empty(&self.nexus_pass),
            ) {
                (Some(url), Some(username), Some(password)) => Some(NexusSettings {
                    base_url: url.trim_end_matches('/').to_string(),
                    credentials: Credentials { username, password },
                }),
                _ => {
                    return Err(ExporterError::Config(
                        "NEXUS_URL, NEXUS_USER, and NEXUS_PASS must be set".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        if self.max_pages == Some(0) {
            return Err(ExporterError::Config("max-pages must be positive".to_string()));
        }

        let jobs = kinds
            .into_iter()
            .map(|kind| {
                let interval = match kind {
                    JobKind::Assets => seconds("scrape-interval", self.scrape_interval),
                    JobKind::Blobstores => seconds("blobstore-interval", self.blobstore_interval),
                    JobKind::Status => seconds("status-interval", self.status_interval),
                    JobKind::Entitlement => {
                        seconds("entitlement-interval", self.entitlement_interval)
                    }
                }?;
                Ok((kind, interval))
            })
            .collect::<Result<Vec<_>, ExporterError>>()?;

        Ok(Settings {
            nexus,
            listen: self.listen,
            jobs,
            entitlement_dir: self.entitlement_dir.clone(),
            list_timeout: seconds("list-timeout", self.list_timeout)?,
            page_timeout: seconds("page-timeout", self.page_timeout)?,
            max_pages: self.max_pages,
        })
    }
}
