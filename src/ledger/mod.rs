//! Generation history and spend accounting.

pub mod migrate;
pub mod models;
pub mod store;

pub use migrate::{migrate, parse_history, RawHistory, RawTotalCost};
pub use models::{is_valid_cost, CostTotals, Generation, History, MAX_GENERATIONS};
pub use store::CostLedger;
