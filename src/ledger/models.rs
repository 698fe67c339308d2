use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pricing::models::{CostEstimate, DEFAULT_CURRENCY};

/// Maximum number of generations kept in history
pub const MAX_GENERATIONS: usize = 100;

/// Costs the ledger stores: finite and non-negative.
pub fn is_valid_cost(cost: f64) -> bool {
    cost.is_finite() && cost >= 0.0
}

/// A completed generation, appended once and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub aspect: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_details: Option<CostEstimate>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_from: Option<String>,
}

impl Generation {
    /// New generation costed by `estimate`.
    pub fn new(
        prompt: impl Into<String>,
        model: impl Into<String>,
        output_path: impl Into<String>,
        estimate: CostEstimate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            model: model.into(),
            aspect: String::new(),
            resolution: String::new(),
            output_path: output_path.into(),
            cost: estimate.amount,
            cost_details: Some(estimate),
            timestamp: Utc::now(),
            seed: None,
            edited_from: None,
        }
    }

    pub fn with_aspect(mut self, aspect: impl Into<String>) -> Self {
        self.aspect = aspect.into();
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_edited_from(mut self, source: impl Into<String>) -> Self {
        self.edited_from = Some(source.into());
        self
    }

    /// The first cost on this generation the ledger cannot store, if any.
    pub fn invalid_cost(&self) -> Option<f64> {
        std::iter::once(self.cost)
            .chain(self.cost_details.as_ref().map(|details| details.amount))
            .find(|cost| !is_valid_cost(*cost))
    }

    /// Currency the cost was recorded in; `USD` when no estimate was kept.
    pub fn currency(&self) -> &str {
        self.cost_details
            .as_ref()
            .map(|details| details.currency.as_str())
            .unwrap_or(DEFAULT_CURRENCY)
    }
}

/// Spend accumulators for one currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CostTotals {
    pub session: f64,
    pub today: f64,
    pub all_time: f64,
}

impl CostTotals {
    pub fn add(&mut self, cost: f64) {
        self.session += cost;
        self.today += cost;
        self.all_time += cost;
    }

    pub fn reset_period(&mut self) {
        self.session = 0.0;
        self.today = 0.0;
    }
}

/// The persisted history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Oldest first
    pub generations: Vec<Generation>,
    pub total_cost: BTreeMap<String, CostTotals>,
    pub last_session_date: Option<NaiveDate>,
}

impl History {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            generations: Vec::new(),
            total_cost: BTreeMap::from([(DEFAULT_CURRENCY.to_string(), CostTotals::default())]),
            last_session_date: Some(today),
        }
    }

    pub fn last(&self) -> Option<&Generation> {
        self.generations.last()
    }

    /// Most recent generations, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Generation> {
        self.generations.iter().rev().take(limit)
    }

    /// Reset `session` and `today` if the ledger was last touched on another
    /// day. Returns whether a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_session_date == Some(today) {
            return false;
        }
        for totals in self.total_cost.values_mut() {
            totals.reset_period();
        }
        self.last_session_date = Some(today);
        true
    }

    /// Append `generation`, accumulate its cost, and evict the oldest entries
    /// beyond [`MAX_GENERATIONS`].
    pub fn record(&mut self, generation: Generation, today: NaiveDate) {
        self.total_cost
            .entry(generation.currency().to_string())
            .or_default()
            .add(generation.cost);
        self.generations.push(generation);
        self.last_session_date = Some(today);

        if self.generations.len() > MAX_GENERATIONS {
            let overflow = self.generations.len() - MAX_GENERATIONS;
            self.generations.drain(..overflow);
        }
    }
}
