use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Unit price of a single endpoint, as cached on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub endpoint_id: String,
    pub unit_price: f64,
    /// Billing unit label, e.g. "image", "megapixel", "gpu_second"
    pub unit: String,
    pub currency: String,
}

impl PriceEntry {
    /// Units billed by compute time rather than by output.
    pub fn is_compute_denominated(&self) -> bool {
        let unit = self.unit.to_lowercase();
        ["gpu", "compute", "second"]
            .iter()
            .any(|marker| unit.contains(marker))
    }

    pub fn is_megapixel(&self) -> bool {
        let unit = self.unit.to_lowercase();
        unit.contains("megapixel") || unit == "mp"
    }
}

/// How the pricing API is asked to quote a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateType {
    UnitPrice,
    HistoricalApiPrice,
}

impl EstimateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnitPrice => "unit_price",
            Self::HistoricalApiPrice => "historical_api_price",
        }
    }
}

/// Provenance of an estimate, from most to least trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    /// Quoted live by the pricing API
    Estimate,
    /// Computed from a cached unit price
    Pricing,
    /// Static flat rate
    Fallback,
}

impl EstimateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Estimate => "estimate",
            Self::Pricing => "pricing",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost estimate for one operation. Also stored verbatim in history as the
/// generation's `costDetails`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    #[serde(rename = "cost", alias = "amount")]
    pub amount: f64,
    pub currency: String,
    pub unit_quantity: f64,
    pub estimate_type: EstimateType,
    pub estimate_source: EstimateSource,
    pub endpoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

impl CostEstimate {
    /// Zero-cost estimate for a model missing from the catalog.
    pub fn unknown_model(model: &str) -> Self {
        Self {
            amount: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            unit_quantity: 0.0,
            estimate_type: EstimateType::UnitPrice,
            estimate_source: EstimateSource::Fallback,
            endpoint_id: model.to_string(),
            unit_price: None,
        }
    }
}

/// Live quote returned by the pricing API.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEstimate {
    pub cost: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub resolution: Option<String>,
    pub num_images: u32,
    /// Editing an existing image; routes to the model's edit endpoint
    pub edit: bool,
}

impl GenerationParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            resolution: None,
            num_images: 1,
            edit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleParams {
    pub model: String,
    pub scale_factor: f64,
    pub input_width: Option<u32>,
    pub input_height: Option<u32>,
}

impl UpscaleParams {
    pub fn new(model: impl Into<String>, scale_factor: f64) -> Self {
        Self {
            model: model.into(),
            scale_factor,
            input_width: None,
            input_height: None,
        }
    }

    /// Input area in megapixels, when both dimensions are known.
    pub fn input_megapixels(&self) -> Option<f64> {
        match (self.input_width, self.input_height) {
            (Some(w), Some(h)) => Some(w as f64 * h as f64 / 1_000_000.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRemovalParams {
    pub model: String,
}

/// A request to estimate, one variant per operation kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateRequest {
    Generation(GenerationParams),
    Upscale(UpscaleParams),
    BackgroundRemoval(BackgroundRemovalParams),
}

impl EstimateRequest {
    pub fn model(&self) -> &str {
        match self {
            Self::Generation(p) => &p.model,
            Self::Upscale(p) => &p.model,
            Self::BackgroundRemoval(p) => &p.model,
        }
    }

    /// Number of upstream calls (or images) the request bills for.
    pub fn calls(&self) -> u32 {
        match self {
            Self::Generation(p) => p.num_images,
            Self::Upscale(_) | Self::BackgroundRemoval(_) => 1,
        }
    }
}
