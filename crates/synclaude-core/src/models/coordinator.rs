//! Cache-first model access
//!
//! `ModelCoordinator` is the one place that decides whether the cache can be
//! trusted or the catalog has to be called, and owns search and lookup over
//! whatever set comes back.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::launcher::TierSelection;

use super::cache::{CacheInfo, ModelCache};
use super::fetcher::CatalogSource;
use super::record::ModelRecord;

pub struct ModelCoordinator {
    cache: ModelCache,
    fetcher: Arc<dyn CatalogSource>,
    api_key: String,
    catalog_url: String,
}

impl ModelCoordinator {
    pub fn new(
        cache: ModelCache,
        fetcher: Arc<dyn CatalogSource>,
        api_key: impl Into<String>,
        catalog_url: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            api_key: api_key.into(),
            catalog_url: catalog_url.into(),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Return the model list, preferring a valid cache.
    ///
    /// Order is fixed: cache check, then network, then persist. A failed
    /// persist is logged and does not fail the call.
    pub async fn fetch_models(&self, force_refresh: bool) -> Result<Vec<ModelRecord>> {
        if !force_refresh && self.cache.is_valid().await {
            let cached = self.cache.load().await;
            if !cached.is_empty() {
                debug!("Using {} cached models", cached.len());
                return Ok(cached);
            }
            debug!("Cache is valid but unusable; fetching from catalog");
        }

        if self.api_key.trim().is_empty() {
            warn!("No API key configured; skipping catalog fetch");
            return Ok(Vec::new());
        }

        info!("Fetching models from {}", self.catalog_url);
        let records = self.fetcher.fetch(&self.api_key, &self.catalog_url).await?;

        if !self.cache.save(&records).await {
            warn!("Could not persist model cache; continuing with fetched models");
        }
        Ok(records)
    }

    async fn resolve_records(&self, records: Option<&[ModelRecord]>) -> Result<Vec<ModelRecord>> {
        match records {
            Some(records) => Ok(records.to_vec()),
            None => self.fetch_models(false).await,
        }
    }

    /// Case-insensitive substring search over id, provider, and the name part
    /// of the id. Results are sorted by id.
    pub async fn search(
        &self,
        query: &str,
        records: Option<&[ModelRecord]>,
    ) -> Result<Vec<ModelRecord>> {
        let records = self.resolve_records(records).await?;
        Ok(search_models(query, &records))
    }

    /// Exact id lookup. A miss is `Ok(None)`.
    pub async fn get_by_id(
        &self,
        id: &str,
        records: Option<&[ModelRecord]>,
    ) -> Result<Option<ModelRecord>> {
        let records = self.resolve_records(records).await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    /// Fill an empty launch selection with the preferred catalog model.
    ///
    /// Selections that can already supply a default are returned unchanged
    /// without touching the cache or the catalog.
    pub async fn resolve_tiers(
        &self,
        tiers: TierSelection,
        saved: Option<&str>,
    ) -> Result<TierSelection> {
        if tiers.has_launch_model() {
            return Ok(tiers);
        }
        let records = self.fetch_models(false).await?;
        let preferred = preferred_model(&records, saved).map(ModelRecord::id);
        if let Some(id) = preferred {
            info!("No model selected; using preferred model {}", id);
        }
        Ok(tiers.or_preferred(preferred))
    }

    pub async fn clear_cache(&self) -> bool {
        self.cache.clear().await
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }
}

/// Filter `records` by `query`; an empty query keeps everything.
///
/// Surrounding whitespace in `query` is ignored, so a blank query also keeps
/// everything.
pub fn search_models(query: &str, records: &[ModelRecord]) -> Vec<ModelRecord> {
    let needle = query.trim().to_lowercase();
    let matches = records
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r.id().to_lowercase().contains(&needle)
                || r.provider().to_lowercase().contains(&needle)
                || r.name_part().to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    sort_models(matches)
}

/// Sort by id ascending. Stable, so equal ids keep their input order.
pub fn sort_models(mut records: Vec<ModelRecord>) -> Vec<ModelRecord> {
    records.sort_by(|a, b| a.id().cmp(b.id()));
    records
}

/// Group records by provider; groups and their members are sorted.
pub fn models_by_provider(records: &[ModelRecord]) -> BTreeMap<String, Vec<ModelRecord>> {
    let mut groups: BTreeMap<String, Vec<ModelRecord>> = BTreeMap::new();
    for record in sort_models(records.to_vec()) {
        groups
            .entry(record.provider().to_string())
            .or_default()
            .push(record);
    }
    groups
}

/// Records that advertise reasoning/thinking support, sorted by id.
pub fn thinking_capable(records: &[ModelRecord]) -> Vec<ModelRecord> {
    sort_models(
        records
            .iter()
            .filter(|r| r.is_thinking_capable())
            .cloned()
            .collect(),
    )
}

/// The model to use when nothing has been chosen: `saved` if it is still in
/// the catalog, otherwise the first record by id.
pub fn preferred_model<'a>(
    records: &'a [ModelRecord],
    saved: Option<&str>,
) -> Option<&'a ModelRecord> {
    if let Some(saved) = saved
        && let Some(record) = records.iter().find(|r| r.id() == saved)
    {
        return Some(record);
    }
    records.iter().min_by(|a, b| a.id().cmp(b.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ModelRecord {
        ModelRecord::new(id).unwrap()
    }

    fn fixture() -> Vec<ModelRecord> {
        vec![
            record("hf:zai-org/GLM-4.6"),
            record("anthropic:claude-sonnet"),
            record("hf:deepseek-ai/DeepSeek-R1").with_feature("reasoning"),
            record("openai:gpt-4").with_provider("Anthropic-Proxy"),
            record("hf:meta-llama/anthropic-distill"),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_and_sorted() {
        let results = search_models("ANTHROPIC", &fixture());
        let ids: Vec<&str> = results.iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![
                "anthropic:claude-sonnet",
                "hf:meta-llama/anthropic-distill",
                "openai:gpt-4",
            ]
        );
    }

    #[test]
    fn test_query_whitespace_is_ignored() {
        let records = vec![record("hf:b/Two"), record("hf:a/One")];
        let found = search_models("  one ", &records);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "hf:a/One");
        assert_eq!(search_models("   ", &records).len(), 2);
    }

    #[test]
    fn test_empty_query_returns_all_sorted() {
        let results = search_models("  ", &fixture());
        assert_eq!(results.len(), 5);
        assert!(results.windows(2).all(|w| w[0].id() <= w[1].id()));
    }

    #[test]
    fn test_models_by_provider() {
        let groups = models_by_provider(&fixture());
        assert_eq!(groups["hf"].len(), 3);
        assert_eq!(groups["anthropic"].len(), 1);
        assert_eq!(groups["Anthropic-Proxy"].len(), 1);
    }

    #[test]
    fn test_thinking_capable() {
        let thinking = thinking_capable(&fixture());
        assert_eq!(thinking.len(), 1);
        assert_eq!(thinking[0].id(), "hf:deepseek-ai/DeepSeek-R1");
    }

    #[test]
    fn test_preferred_model() {
        let records = fixture();
        assert_eq!(
            preferred_model(&records, Some("hf:zai-org/GLM-4.6")).map(|r| r.id()),
            Some("hf:zai-org/GLM-4.6")
        );
        assert_eq!(
            preferred_model(&records, Some("gone:model")).map(|r| r.id()),
            Some("anthropic:claude-sonnet")
        );
        assert!(preferred_model(&[], None).is_none());
    }
}
