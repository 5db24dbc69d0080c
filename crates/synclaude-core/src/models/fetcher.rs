//! Remote model catalog client
//!
//! Calls `GET <models_api_url>` with a bearer token and turns the `data`
//! array into [`ModelRecord`]s. Entries are parsed one by one so a single bad
//! entry is skipped instead of failing the whole listing.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::CatalogError;

use super::record::{parse_model_entry, ModelRecord};

/// Default request timeout for catalog calls
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can produce the model catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, api_key: &str, catalog_url: &str)
        -> Result<Vec<ModelRecord>, CatalogError>;
}

/// reqwest-backed catalog client
pub struct HttpCatalogFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpCatalogFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpCatalogFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogFetcher {
    async fn fetch(
        &self,
        api_key: &str,
        catalog_url: &str,
    ) -> Result<Vec<ModelRecord>, CatalogError> {
        if api_key.trim().is_empty() {
            warn!("No API key configured; returning an empty model list");
            return Ok(Vec::new());
        }

        let request = self
            .client
            .get(catalog_url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .build()
            .map_err(|e| CatalogError::InvalidRequest {
                url: catalog_url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Fetching model catalog from {}", catalog_url);
        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_builder() {
                CatalogError::InvalidRequest {
                    url: catalog_url.to_string(),
                    reason: e.to_string(),
                }
            } else {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                };
                CatalogError::NoResponse {
                    url: catalog_url.to_string(),
                    reason,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ErrorResponse {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::MalformedBody(e.to_string()))?;
        let records = parse_catalog_body(&body)?;
        info!("Fetched {} models from catalog", records.len());
        Ok(records)
    }
}

/// Parse a catalog response body of the form `{ "data": [...], "object": "list" }`.
///
/// Entries that fail validation are logged and skipped.
pub fn parse_catalog_body(body: &Value) -> Result<Vec<ModelRecord>, CatalogError> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::MalformedBody("missing `data` array".to_string()))?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_model_entry(entry) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping catalog entry {}: {}", index, e),
        }
    }
    Ok(records)
}
