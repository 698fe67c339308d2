//! Cost estimation with a three-tier degrade chain.
//!
//! 1. `estimate`: live quote from the pricing API
//! 2. `pricing`: cached unit price × quantity
//! 3. `fallback`: static catalog flat rate
//!
//! Estimation never fails; it only loses precision.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PricingError;
use crate::pricing::cache::PricingCache;
use crate::pricing::catalog::{self, CatalogEntry};
use crate::pricing::models::{
    BackgroundRemovalParams, CostEstimate, EstimateRequest, EstimateSource, EstimateType,
    GenerationParams, LiveEstimate, PriceEntry, UpscaleParams, DEFAULT_CURRENCY,
};

/// Live cost quotes.
#[async_trait]
pub trait PriceEstimator: Send + Sync {
    async fn estimate(
        &self,
        estimate_type: EstimateType,
        endpoint_id: &str,
        quantity: f64,
    ) -> Result<LiveEstimate, PricingError>;
}

/// Outcome of a single tier of the degrade chain.
#[derive(Debug)]
enum TierOutcome {
    Resolved(CostEstimate),
    Unavailable {
        tier: EstimateSource,
        reason: String,
    },
}

impl TierOutcome {
    fn unavailable(tier: EstimateSource, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            tier,
            reason: reason.into(),
        }
    }

    fn or_else(self, next: impl FnOnce() -> TierOutcome) -> TierOutcome {
        match self {
            Self::Resolved(estimate) => Self::Resolved(estimate),
            Self::Unavailable { tier, reason } => {
                debug!("Estimate tier '{}' unavailable: {}", tier, reason);
                next()
            }
        }
    }

    fn or_fallback(self, fallback: impl FnOnce() -> CostEstimate) -> CostEstimate {
        match self {
            Self::Resolved(estimate) => estimate,
            Self::Unavailable { tier, reason } => {
                debug!("Estimate tier '{}' unavailable: {}", tier, reason);
                fallback()
            }
        }
    }
}

/// What to ask for, derived from the request and the cached unit.
#[derive(Debug, Clone, PartialEq)]
struct QuotePlan {
    endpoint_id: String,
    estimate_type: EstimateType,
    /// Quantity quoted to the pricing API
    quantity: f64,
    /// Images or calls billed, used by the flat-rate tier
    calls: u32,
}

impl QuotePlan {
    fn new(request: &EstimateRequest, endpoint_id: &str, cached: Option<&PriceEntry>) -> Self {
        let calls = request.calls();

        if cached.is_some_and(PriceEntry::is_compute_denominated) {
            return Self {
                endpoint_id: endpoint_id.to_string(),
                estimate_type: EstimateType::HistoricalApiPrice,
                quantity: (calls as f64).round().max(1.0),
                calls,
            };
        }

        let quantity = match request {
            EstimateRequest::Generation(params) => params.num_images as f64,
            EstimateRequest::Upscale(params) => {
                match (cached.is_some_and(PriceEntry::is_megapixel), params.input_megapixels()) {
                    (true, Some(megapixels)) => megapixels * params.scale_factor.powi(2),
                    _ => 1.0,
                }
            }
            EstimateRequest::BackgroundRemoval(_) => 1.0,
        };

        Self {
            endpoint_id: endpoint_id.to_string(),
            estimate_type: EstimateType::UnitPrice,
            quantity,
            calls,
        }
    }
}

/// Produces cost estimates for generation, upscale and background removal.
pub struct EstimationEngine {
    cache: PricingCache,
    live: Arc<dyn PriceEstimator>,
}

impl EstimationEngine {
    pub fn new(cache: PricingCache, live: Arc<dyn PriceEstimator>) -> Self {
        Self { cache, live }
    }

    pub fn cache(&self) -> &PricingCache {
        &self.cache
    }

    pub async fn estimate_generation_cost(&self, params: &GenerationParams) -> CostEstimate {
        self.estimate(&EstimateRequest::Generation(params.clone()))
            .await
    }

    pub async fn estimate_upscale_cost(&self, params: &UpscaleParams) -> CostEstimate {
        self.estimate(&EstimateRequest::Upscale(params.clone())).await
    }

    pub async fn estimate_background_removal_cost(
        &self,
        params: &BackgroundRemovalParams,
    ) -> CostEstimate {
        self.estimate(&EstimateRequest::BackgroundRemoval(params.clone()))
            .await
    }

    pub async fn estimate(&self, request: &EstimateRequest) -> CostEstimate {
        let Some(entry) = catalog::lookup(request.model()) else {
            warn!("Unknown model '{}', reporting zero cost", request.model());
            return CostEstimate::unknown_model(request.model());
        };

        let edit = matches!(request, EstimateRequest::Generation(p) if p.edit);
        let endpoint_id = entry.endpoint_for(edit);

        let mut prices = self
            .cache
            .get_or_refresh(&[endpoint_id.to_string()], false)
            .await;
        let cached = prices.remove(endpoint_id);
        let plan = QuotePlan::new(request, endpoint_id, cached.as_ref());

        let estimate = self
            .live_tier(&plan, cached.as_ref())
            .await
            .or_else(|| cached_tier(&plan, cached.as_ref()))
            .or_fallback(|| fallback_tier(&plan, entry));

        debug!(
            "Estimated {:.4} {} for {} via {}",
            estimate.amount, estimate.currency, endpoint_id, estimate.estimate_source
        );
        estimate
    }

    async fn live_tier(&self, plan: &QuotePlan, cached: Option<&PriceEntry>) -> TierOutcome {
        match self
            .live
            .estimate(plan.estimate_type, &plan.endpoint_id, plan.quantity)
            .await
        {
            Ok(live) => TierOutcome::Resolved(CostEstimate {
                amount: live.cost,
                currency: live.currency,
                unit_quantity: plan.quantity,
                estimate_type: plan.estimate_type,
                estimate_source: EstimateSource::Estimate,
                endpoint_id: plan.endpoint_id.clone(),
                unit_price: cached.map(|entry| entry.unit_price),
            }),
            Err(e) => TierOutcome::unavailable(EstimateSource::Estimate, e.to_string()),
        }
    }
}

fn cached_tier(plan: &QuotePlan, cached: Option<&PriceEntry>) -> TierOutcome {
    let Some(entry) = cached else {
        return TierOutcome::unavailable(EstimateSource::Pricing, "no cached price");
    };
    if plan.estimate_type != EstimateType::UnitPrice {
        return TierOutcome::unavailable(
            EstimateSource::Pricing,
            format!("unit '{}' is compute-denominated", entry.unit),
        );
    }

    TierOutcome::Resolved(CostEstimate {
        amount: entry.unit_price * plan.quantity,
        currency: entry.currency.clone(),
        unit_quantity: plan.quantity,
        estimate_type: EstimateType::UnitPrice,
        estimate_source: EstimateSource::Pricing,
        endpoint_id: plan.endpoint_id.clone(),
        unit_price: Some(entry.unit_price),
    })
}

fn fallback_tier(plan: &QuotePlan, entry: &CatalogEntry) -> CostEstimate {
    CostEstimate {
        amount: entry.flat_rate * plan.calls as f64,
        currency: DEFAULT_CURRENCY.to_string(),
        unit_quantity: plan.calls as f64,
        estimate_type: EstimateType::UnitPrice,
        estimate_source: EstimateSource::Fallback,
        endpoint_id: plan.endpoint_id.clone(),
        unit_price: Some(entry.flat_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::cache::{CacheSnapshot, PricingSource};
    use crate::storage;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct DownPricing;

    #[async_trait]
    impl PricingSource for DownPricing {
        async fn list_prices(&self, _ids: &[String]) -> Result<Vec<PriceEntry>, PricingError> {
            Err(PricingError::MissingCredential)
        }
    }

    /// Live estimator recording every quote request.
    struct FakeLive {
        cost: Option<f64>,
        requests: Mutex<Vec<(EstimateType, String, f64)>>,
    }

    impl FakeLive {
        fn down() -> Arc<Self> {
            Arc::new(Self {
                cost: None,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn quoting(cost: f64) -> Arc<Self> {
            Arc::new(Self {
                cost: Some(cost),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> (EstimateType, String, f64) {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl PriceEstimator for FakeLive {
        async fn estimate(
            &self,
            estimate_type: EstimateType,
            endpoint_id: &str,
            quantity: f64,
        ) -> Result<LiveEstimate, PricingError> {
            self.requests
                .lock()
                .unwrap()
                .push((estimate_type, endpoint_id.to_string(), quantity));
            match self.cost {
                Some(cost) => Ok(LiveEstimate {
                    cost,
                    currency: "USD".to_string(),
                }),
                None => Err(PricingError::Upstream {
                    status: 503,
                    message: "down".to_string(),
                }),
            }
        }
    }

    async fn engine_with_cache(
        dir: &TempDir,
        entries: &[(&str, f64, &str)],
        live: Arc<FakeLive>,
    ) -> EstimationEngine {
        let path = dir.path().join("pricing-cache.json");
        if !entries.is_empty() {
            let prices: HashMap<String, PriceEntry> = entries
                .iter()
                .map(|(id, unit_price, unit)| {
                    (
                        id.to_string(),
                        PriceEntry {
                            endpoint_id: id.to_string(),
                            unit_price: *unit_price,
                            unit: unit.to_string(),
                            currency: "USD".to_string(),
                        },
                    )
                })
                .collect();
            let snapshot = CacheSnapshot {
                fetched_at: Utc::now().to_rfc3339(),
                prices,
            };
            storage::write_json(&path, &snapshot).await.unwrap();
        }

        let cache = PricingCache::new(path, Arc::new(DownPricing));
        EstimationEngine::new(cache, live)
    }

    fn banana(num_images: u32) -> GenerationParams {
        GenerationParams {
            model: "banana".to_string(),
            resolution: Some("2K".to_string()),
            num_images,
            edit: false,
        }
    }

    #[tokio::test]
    async fn test_cached_unit_price_when_live_estimate_fails() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/nano-banana-pro", 0.20, "image")],
            FakeLive::down(),
        )
        .await;

        let estimate = engine.estimate_generation_cost(&banana(1)).await;

        assert!((estimate.amount - 0.20).abs() < 1e-9);
        assert_eq!(estimate.estimate_source, EstimateSource::Pricing);
        assert_eq!(estimate.estimate_type, EstimateType::UnitPrice);
        assert_eq!(estimate.unit_price, Some(0.20));
    }

    #[tokio::test]
    async fn test_static_fallback_when_everything_is_down() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_cache(&dir, &[], FakeLive::down()).await;

        let estimate = engine.estimate_generation_cost(&banana(1)).await;

        assert_eq!(estimate.estimate_source, EstimateSource::Fallback);
        assert_eq!(estimate.amount, 0.15);
        assert_eq!(estimate.endpoint_id, "fal-ai/nano-banana-pro");
    }

    #[tokio::test]
    async fn test_fallback_scales_with_image_count() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_cache(&dir, &[], FakeLive::down()).await;

        let one = engine.estimate_generation_cost(&banana(1)).await;
        let four = engine.estimate_generation_cost(&banana(4)).await;

        assert_eq!(four.amount, 4.0 * one.amount);
        assert_eq!(four.unit_quantity, 4.0);
    }

    #[tokio::test]
    async fn test_live_estimate_wins() {
        let dir = TempDir::new().unwrap();
        let live = FakeLive::quoting(0.42);
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/nano-banana-pro", 0.20, "image")],
            live.clone(),
        )
        .await;

        let estimate = engine.estimate_generation_cost(&banana(2)).await;

        assert_eq!(estimate.estimate_source, EstimateSource::Estimate);
        assert_eq!(estimate.amount, 0.42);
        assert_eq!(
            live.last_request(),
            (EstimateType::UnitPrice, "fal-ai/nano-banana-pro".to_string(), 2.0)
        );
    }

    #[tokio::test]
    async fn test_unknown_model_is_free_fallback() {
        let dir = TempDir::new().unwrap();
        let live = FakeLive::quoting(1.0);
        let engine = engine_with_cache(&dir, &[], live.clone()).await;

        let estimate = engine
            .estimate_generation_cost(&GenerationParams::new("mystery-model"))
            .await;

        assert_eq!(estimate.estimate_source, EstimateSource::Fallback);
        assert_eq!(estimate.amount, 0.0);
        assert!(live.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_uses_edit_endpoint() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/nano-banana-pro/edit", 0.25, "image")],
            FakeLive::down(),
        )
        .await;

        let mut params = banana(1);
        params.edit = true;
        let estimate = engine.estimate_generation_cost(&params).await;

        assert_eq!(estimate.endpoint_id, "fal-ai/nano-banana-pro/edit");
        assert_eq!(estimate.estimate_source, EstimateSource::Pricing);
        assert_eq!(estimate.amount, 0.25);
    }

    #[tokio::test]
    async fn test_megapixel_upscale_scales_quadratically() {
        let dir = TempDir::new().unwrap();
        let live = FakeLive::down();
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/clarity-upscaler", 0.01, "megapixel")],
            live.clone(),
        )
        .await;

        let mut params = UpscaleParams::new("clarity", 2.0);
        params.input_width = Some(1000);
        params.input_height = Some(1000);
        let estimate = engine.estimate_upscale_cost(&params).await;

        // 1 MP input at 2x scale is 4 MP of output.
        assert!((estimate.unit_quantity - 4.0).abs() < 1e-9);
        assert!((estimate.amount - 0.04).abs() < 1e-9);
        assert_eq!(estimate.estimate_source, EstimateSource::Pricing);
        assert_eq!(live.last_request().2, estimate.unit_quantity);
    }

    #[tokio::test]
    async fn test_upscale_without_dimensions_counts_one_unit() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/clarity-upscaler", 0.01, "megapixel")],
            FakeLive::down(),
        )
        .await;

        let estimate = engine
            .estimate_upscale_cost(&UpscaleParams::new("clarity", 4.0))
            .await;
        assert_eq!(estimate.unit_quantity, 1.0);
        assert!((estimate.amount - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_compute_priced_endpoint_skips_cached_tier() {
        let dir = TempDir::new().unwrap();
        let live = FakeLive::down();
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/birefnet/v2", 0.0005, "gpu_second")],
            live.clone(),
        )
        .await;

        let estimate = engine
            .estimate_background_removal_cost(&BackgroundRemovalParams {
                model: "birefnet".to_string(),
            })
            .await;

        assert_eq!(
            live.last_request(),
            (
                EstimateType::HistoricalApiPrice,
                "fal-ai/birefnet/v2".to_string(),
                1.0
            )
        );
        assert_eq!(estimate.estimate_source, EstimateSource::Fallback);
        assert_eq!(estimate.amount, 0.01);
    }

    #[tokio::test]
    async fn test_compute_priced_live_quote_uses_call_count() {
        let dir = TempDir::new().unwrap();
        let live = FakeLive::quoting(0.06);
        let engine = engine_with_cache(
            &dir,
            &[("fal-ai/flux-2-pro", 0.0011, "compute seconds")],
            live.clone(),
        )
        .await;

        let mut params = GenerationParams::new("flux");
        params.num_images = 3;
        let estimate = engine.estimate_generation_cost(&params).await;

        assert_eq!(estimate.estimate_type, EstimateType::HistoricalApiPrice);
        assert_eq!(estimate.estimate_source, EstimateSource::Estimate);
        assert_eq!(live.last_request().2, 3.0);
    }

    #[test]
    fn test_zero_images_still_quotes_one_call_when_compute_priced() {
        let entry = PriceEntry {
            endpoint_id: "x".to_string(),
            unit_price: 0.001,
            unit: "gpu_second".to_string(),
            currency: "USD".to_string(),
        };
        let mut params = GenerationParams::new("banana");
        params.num_images = 0;
        let plan = QuotePlan::new(&EstimateRequest::Generation(params), "x", Some(&entry));
        assert_eq!(plan.quantity, 1.0);
    }
}
