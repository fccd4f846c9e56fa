//! In-process stand-ins for the Nexus REST API

#![allow(dead_code)]

use async_trait::async_trait;
use nexus_exporter::client::NexusApi;
use nexus_exporter::error::{ExporterError, Result};
use nexus_exporter::types::Page;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// One scripted asset page; `None` makes the fetch fail with a 500.
pub type ScriptedPage = Option<Vec<Value>>;

#[derive(Default)]
pub struct FakeNexus {
    pub repositories: Option<Vec<Value>>,
    pub assets: HashMap<String, Vec<ScriptedPage>>,
    pub blobstores: Option<Vec<Value>>,
    pub checks: Option<Map<String, Value>>,
    pub asset_calls: Mutex<Vec<(String, Option<String>)>>,
}

fn server_error(path: &str) -> ExporterError {
    ExporterError::Status {
        url: format!("http://nexus.test{}", path),
        status: StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl FakeNexus {
    pub fn with_repository(mut self, name: &str, pages: Vec<ScriptedPage>) -> Self {
        self.repositories
            .get_or_insert_with(Vec::new)
            .push(serde_json::json!({ "name": name }));
        self.assets.insert(name.to_string(), pages);
        self
    }

    pub fn calls_for(&self, repository: &str) -> usize {
        self.asset_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(repo, _)| repo == repository)
            .count()
    }
}

#[async_trait]
impl NexusApi for FakeNexus {
    async fn list_repositories(&self) -> Result<Vec<Value>> {
        self.repositories
            .clone()
            .ok_or_else(|| server_error("/service/rest/v1/repositories"))
    }

    async fn search_assets(&self, repository: &str, cursor: Option<String>) -> Result<Page> {
        self.asset_calls
            .lock()
            .unwrap()
            .push((repository.to_string(), cursor.clone()));

        // Cursor "p3" addresses the fourth scripted page.
        let index = match cursor.as_deref() {
            None => 0,
            Some(token) => token.trim_start_matches('p').parse::<usize>().unwrap(),
        };
        let pages = self.assets.get(repository).cloned().unwrap_or_default();
        let items = pages
            .get(index)
            .cloned()
            .flatten()
            .ok_or_else(|| server_error("/service/rest/v1/search/assets"))?;

        let next = (index + 1 < pages.len()).then(|| format!("p{}", index + 1));
        Ok(Page::new(items, next.as_deref()))
    }

    async fn list_blobstores(&self) -> Result<Vec<Value>> {
        self.blobstores
            .clone()
            .ok_or_else(|| server_error("/service/rest/v1/blobstores"))
    }

    async fn status_checks(&self) -> Result<Map<String, Value>> {
        self.checks
            .clone()
            .ok_or_else(|| server_error("/service/rest/v1/status/check"))
    }
}
