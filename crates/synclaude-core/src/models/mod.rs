//! Model catalog: records, cache, remote fetch, and the coordinator that
//! chooses between them.

mod cache;
mod coordinator;
mod fetcher;
mod record;

pub use cache::{CacheInfo, ModelCache};
pub use coordinator::{
    models_by_provider, preferred_model, search_models, sort_models, thinking_capable,
    ModelCoordinator,
};
pub use fetcher::{parse_catalog_body, CatalogSource, HttpCatalogFetcher, DEFAULT_FETCH_TIMEOUT};
pub use record::{parse_model_entry, provider_from_id, ModelPricing, ModelRecord, RawModel};
