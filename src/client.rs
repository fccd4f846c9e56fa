use crate::error::{ExporterError, Result};
use crate::types::Page;
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

const REPOSITORIES_PATH: &str = "/service/rest/v1/repositories";
const SEARCH_ASSETS_PATH: &str = "/service/rest/v1/search/assets";
const BLOBSTORES_PATH: &str = "/service/rest/v1/blobstores";
const STATUS_CHECK_PATH: &str = "/service/rest/v1/status/check";

/// The repository-manager endpoints the source jobs read from.
#[async_trait]
pub trait NexusApi: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<Value>>;

    async fn search_assets(&self, repository: &str, cursor: Option<String>) -> Result<Page>;

    async fn list_blobstores(&self) -> Result<Vec<Value>>;

    async fn status_checks(&self) -> Result<Map<String, Value>>;
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

pub struct NexusClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    list_timeout: Duration,
    page_timeout: Duration,
}

impl NexusClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        list_timeout: Duration,
        page_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nexus-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            list_timeout,
            page_timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ExporterError::Status {
                url,
                status: resp.status(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ExporterError::Decode { url, source })
    }
}

#[async_trait]
impl NexusApi for NexusClient {
    async fn list_repositories(&self) -> Result<Vec<Value>> {
        self.get_json(REPOSITORIES_PATH, &[], self.list_timeout).await
    }

    async fn search_assets(&self, repository: &str, cursor: Option<String>) -> Result<Page> {
        let mut query = vec![("repository", repository)];
        if let Some(token) = cursor.as_deref() {
            query.push(("continuationToken", token));
        }
        self.get_json(SEARCH_ASSETS_PATH, &query, self.page_timeout).await
    }

    async fn list_blobstores(&self) -> Result<Vec<Value>> {
        self.get_json(BLOBSTORES_PATH, &[], self.list_timeout).await
    }

    async fn status_checks(&self) -> Result<Map<String, Value>> {
        self.get_json(STATUS_CHECK_PATH, &[], self.list_timeout).await
    }
}
