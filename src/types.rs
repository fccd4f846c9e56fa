use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One response unit of a cursor-paginated collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T = Value> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(rename = "continuationToken", default)]
    pub continuation_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation_token: Option<&str>) -> Self {
        Self {
            items,
            continuation_token: continuation_token.map(str::to_string),
        }
    }

    /// The cursor for the following page; an empty token ends the walk.
    pub fn next_cursor(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Label set identifying one series under a metric name.
pub type Labels = BTreeMap<String, String>;

pub fn labels<const N: usize>(pairs: [(&str, &str); N]) -> Labels {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum JobKind {
    Assets,
    Blobstores,
    Status,
    Entitlement,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Assets => "assets",
            JobKind::Blobstores => "blobstores",
            JobKind::Status => "status",
            JobKind::Entitlement => "entitlement",
        }
    }

    pub fn needs_nexus(&self) -> bool {
        !matches!(self, JobKind::Entitlement)
    }
}
