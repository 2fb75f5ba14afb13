//! HTTP client for the public creature list endpoint

use super::{CreatureDescriptor, CreatureSource, SourceError};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

#[derive(Debug, Deserialize)]
struct ListResponse {
    results: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

/// Fetches paginated creature lists over HTTP
#[derive(Debug, Clone)]
pub struct PokeApiSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PokeApiSource {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PokeApiSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, limit: usize, offset: usize) -> String {
        format!("{}/pokemon?limit={limit}&offset={offset}", self.base_url)
    }

    /// Decode a list response body, skipping entries without a usable id
    pub fn parse_list(body: &str) -> Result<Vec<CreatureDescriptor>, SourceError> {
        let response: ListResponse = serde_json::from_str(body)?;
        Ok(response
            .results
            .into_iter()
            .filter_map(|entry| {
                let descriptor = CreatureDescriptor::from_resource(&entry.name, &entry.url);
                if descriptor.is_none() {
                    log::warn!("Skipping creature {} with unrecognised url {}", entry.name, entry.url);
                }
                descriptor
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl CreatureSource for PokeApiSource {
    async fn fetch_batch(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreatureDescriptor>, SourceError> {
        let url = self.list_url(limit, offset);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        Self::parse_list(&body)
    }
}
