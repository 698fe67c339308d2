//! Command implementations for the CLI
//!
//! - estimate: Quote generation, upscale and background removal
//! - record: Append a completed generation to the history
//! - history: Recent generations and spend totals
//! - pricing: Inspect or refresh the pricing cache
//! - config: Configuration display and validation

pub mod config;
pub mod estimate;
pub mod history;
pub mod pricing;
pub mod record;

use std::sync::Arc;

use falgen::config::Config;
use falgen::credentials::{CredentialProvider, EnvCredential, StaticCredential};

/// Credentials for API calls: an explicit `--api-key`, else the configured
/// environment variable.
pub fn credentials(cfg: &Config, api_key: Option<String>) -> Arc<dyn CredentialProvider> {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => Arc::new(StaticCredential::new(key.trim())),
        None => Arc::new(EnvCredential::new(cfg.api.api_key_env.clone())),
    }
}

/// Format an amount with a currency symbol where one is well known.
pub fn format_cost(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.4}", amount),
        "EUR" => format!("€{:.4}", amount),
        other => format!("{:.4} {}", amount, other),
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
