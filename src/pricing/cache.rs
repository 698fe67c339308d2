use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::PricingError;
use crate::pricing::models::PriceEntry;
use crate::storage::{self, ReadOutcome};

/// Upper bound on endpoint ids per pricing request
pub const MAX_BATCH_SIZE: usize = 50;

pub const DEFAULT_TTL_HOURS: i64 = 6;

/// Where unit prices come from.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Fetch prices for at most [`MAX_BATCH_SIZE`] endpoints.
    async fn list_prices(&self, endpoint_ids: &[String]) -> Result<Vec<PriceEntry>, PricingError>;
}

/// On-disk pricing cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// RFC 3339 timestamp of the last successful fetch
    pub fetched_at: String,
    #[serde(default)]
    pub prices: HashMap<String, PriceEntry>,
}

impl CacheSnapshot {
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.fetched_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Fresh iff `fetched_at` parses and is less than `ttl` old.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.fetched_at() {
            Some(fetched_at) => now.signed_duration_since(fetched_at) < ttl,
            None => false,
        }
    }
}

/// TTL-bounded cache of per-endpoint unit prices.
pub struct PricingCache {
    path: PathBuf,
    ttl: Duration,
    batch_size: usize,
    source: Arc<dyn PricingSource>,
}

impl PricingCache {
    pub fn new(path: impl Into<PathBuf>, source: Arc<dyn PricingSource>) -> Self {
        Self {
            path: path.into(),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            batch_size: MAX_BATCH_SIZE,
            source,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load the cache file. Missing or unparsable files yield `None`.
    pub async fn load(&self) -> Option<CacheSnapshot> {
        match storage::read_json::<CacheSnapshot>(&self.path).await {
            ReadOutcome::Loaded(snapshot) => Some(snapshot),
            ReadOutcome::Absent => None,
            ReadOutcome::Corrupt(reason) => {
                warn!(
                    "Ignoring corrupt pricing cache {}: {}",
                    self.path.display(),
                    reason
                );
                None
            }
        }
    }

    pub fn is_fresh(&self, snapshot: &CacheSnapshot, now: DateTime<Utc>) -> bool {
        snapshot.is_fresh(now, self.ttl)
    }

    /// Return prices for `endpoint_ids`, refreshing from the pricing source
    /// when the cache is stale, incomplete, or `force_refresh` is set.
    ///
    /// Never fails: on any fetch error the last known prices are returned.
    pub async fn get_or_refresh(
        &self,
        endpoint_ids: &[String],
        force_refresh: bool,
    ) -> HashMap<String, PriceEntry> {
        self.get_or_refresh_at(endpoint_ids, force_refresh, Utc::now())
            .await
    }

    pub async fn get_or_refresh_at(
        &self,
        endpoint_ids: &[String],
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> HashMap<String, PriceEntry> {
        let cached = self.load().await;
        let fresh = cached
            .as_ref()
            .map(|snapshot| self.is_fresh(snapshot, now))
            .unwrap_or(false);
        let mut prices = cached.map(|snapshot| snapshot.prices).unwrap_or_default();

        let missing = endpoint_ids
            .iter()
            .filter(|id| !prices.contains_key(*id))
            .count();

        if !force_refresh && fresh && missing == 0 {
            debug!("Pricing cache hit for {} endpoints", endpoint_ids.len());
            return prices;
        }

        let fetched = match self.fetch(endpoint_ids).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Pricing refresh failed, using cached prices: {}", e);
                return prices;
            }
        };

        info!(
            "Fetched {} prices ({} requested, {} missing from cache)",
            fetched.len(),
            endpoint_ids.len(),
            missing
        );

        for entry in fetched {
            prices.insert(entry.endpoint_id.clone(), entry);
        }

        let snapshot = CacheSnapshot {
            fetched_at: now.to_rfc3339(),
            prices,
        };

        if let Err(e) = storage::write_json(&self.path, &snapshot).await {
            warn!("Failed to persist pricing cache: {}", e);
        }

        snapshot.prices
    }

    async fn fetch(&self, endpoint_ids: &[String]) -> Result<Vec<PriceEntry>, PricingError> {
        let mut ids: Vec<String> = Vec::with_capacity(endpoint_ids.len());
        for id in endpoint_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        let mut fetched = Vec::with_capacity(ids.len());
        for batch in ids.chunks(self.batch_size) {
            debug!("Requesting prices for batch of {}", batch.len());
            fetched.extend(self.source.list_prices(batch).await?);
        }

        Ok(fetched)
    }
}
