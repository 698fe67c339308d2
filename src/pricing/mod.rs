pub mod cache;
pub mod catalog;
pub mod client;
pub mod estimator;
pub mod models;

pub use cache::{CacheSnapshot, PricingCache, PricingSource};
pub use catalog::{CatalogEntry, ModelKind};
pub use client::FalPricingClient;
pub use estimator::{EstimationEngine, PriceEstimator};
pub use models::{
    BackgroundRemovalParams, CostEstimate, EstimateRequest, EstimateSource, EstimateType,
    GenerationParams, LiveEstimate, PriceEntry, UpscaleParams,
};

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::error::AppError;

/// Build an estimation engine backed by the fal pricing API.
pub fn build_engine(
    cfg: &Config,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<EstimationEngine, AppError> {
    let client = Arc::new(FalPricingClient::new(
        cfg.api.base_url.clone(),
        cfg.request_timeout(),
        credentials,
    )?);

    let cache = PricingCache::new(cfg.cache_path()?, client.clone())
        .with_ttl(cfg.cache_ttl())
        .with_batch_size(cfg.pricing.batch_size);

    Ok(EstimationEngine::new(cache, client))
}
