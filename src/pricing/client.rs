use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::credentials::CredentialProvider;
use crate::error::PricingError;
use crate::logging::SensitiveApiKey;
use crate::pricing::cache::{PricingSource, MAX_BATCH_SIZE};
use crate::pricing::estimator::PriceEstimator;
use crate::pricing::models::{EstimateType, LiveEstimate, PriceEntry, DEFAULT_CURRENCY};

/// Client for the fal.ai platform pricing API.
pub struct FalPricingClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Debug, Deserialize)]
struct PricingResponse {
    #[serde(default)]
    prices: Vec<WirePrice>,
}

#[derive(Debug, Deserialize)]
struct WirePrice {
    endpoint_id: String,
    unit_price: f64,
    unit: String,
    #[serde(default = "default_currency")]
    currency: String,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    total_cost: f64,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl FalPricingClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, PricingError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("falgen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn authorization(&self) -> Result<String, PricingError> {
        let key = self
            .credentials
            .api_key()
            .ok_or(PricingError::MissingCredential)?;
        debug!("Using API key {}", SensitiveApiKey::new(&key));
        Ok(format!("Key {}", key))
    }

    async fn check_status(response: Response) -> Result<Response, PricingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
        Err(PricingError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PricingSource for FalPricingClient {
    async fn list_prices(&self, endpoint_ids: &[String]) -> Result<Vec<PriceEntry>, PricingError> {
        if endpoint_ids.is_empty() {
            return Ok(Vec::new());
        }
        debug_assert!(endpoint_ids.len() <= MAX_BATCH_SIZE);

        let url = format!("{}/v1/models/pricing", self.base_url);
        let query: Vec<(&str, &str)> = endpoint_ids
            .iter()
            .map(|id| ("endpoint_id", id.as_str()))
            .collect();

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.authorization()?)
            .query(&query)
            .send()
            .await?;

        let body: PricingResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PricingError::Parse(e.to_string()))?;

        debug!("Pricing API returned {} prices", body.prices.len());

        Ok(body
            .prices
            .into_iter()
            .map(|p| PriceEntry {
                endpoint_id: p.endpoint_id,
                unit_price: p.unit_price,
                unit: p.unit,
                currency: p.currency,
            })
            .collect())
    }
}

#[async_trait]
impl PriceEstimator for FalPricingClient {
    async fn estimate(
        &self,
        estimate_type: EstimateType,
        endpoint_id: &str,
        quantity: f64,
    ) -> Result<LiveEstimate, PricingError> {
        let url = format!("{}/v1/models/pricing/estimate", self.base_url);
        let quantity_field = match estimate_type {
            EstimateType::UnitPrice => "unit_quantity",
            EstimateType::HistoricalApiPrice => "call_quantity",
        };
        let body = json!({
            "estimate_type": estimate_type.as_str(),
            "endpoints": {
                endpoint_id: { quantity_field: quantity }
            }
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.authorization()?)
            .json(&body)
            .send()
            .await?;

        let estimate: EstimateResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PricingError::Parse(e.to_string()))?;

        if !estimate.total_cost.is_finite() || estimate.total_cost < 0.0 {
            return Err(PricingError::Parse(format!(
                "invalid total_cost {}",
                estimate.total_cost
            )));
        }

        Ok(LiveEstimate {
            cost: estimate.total_cost,
            currency: estimate.currency,
        })
    }
}
