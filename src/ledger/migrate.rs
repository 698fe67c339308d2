//! Parsing, validation and schema migration of the history file.
//!
//! Older releases stored a single flat `totalCost` object. Current files keep
//! one bucket per currency. [`migrate`] accepts both and is idempotent.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::ledger::models::{is_valid_cost, CostTotals, Generation, History};
use crate::pricing::models::DEFAULT_CURRENCY;

/// History file as found on disk, before migration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistory {
    #[serde(default)]
    pub generations: Vec<Generation>,
    #[serde(default)]
    pub total_cost: Option<RawTotalCost>,
    #[serde(default)]
    pub last_session_date: Option<String>,
}

/// Either shape of `totalCost`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTotalCost {
    /// `{session, today, allTime}`, implicitly USD
    Legacy(CostTotals),
    ByCurrency(BTreeMap<String, CostTotals>),
}

/// Parse and validate raw history bytes.
pub fn parse_history(bytes: &[u8]) -> Result<RawHistory, String> {
    let raw: RawHistory = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    validate(&raw)?;
    Ok(raw)
}

fn validate(raw: &RawHistory) -> Result<(), String> {
    for generation in &raw.generations {
        if let Some(cost) = generation.invalid_cost() {
            return Err(format!(
                "generation {} has invalid cost {}",
                generation.id, cost
            ));
        }
    }

    let buckets: Vec<(&str, &CostTotals)> = match &raw.total_cost {
        Some(RawTotalCost::Legacy(totals)) => vec![(DEFAULT_CURRENCY, totals)],
        Some(RawTotalCost::ByCurrency(map)) => {
            map.iter().map(|(currency, t)| (currency.as_str(), t)).collect()
        }
        None => Vec::new(),
    };
    for (currency, totals) in buckets {
        if ![totals.session, totals.today, totals.all_time]
            .iter()
            .all(|v| is_valid_cost(*v))
        {
            return Err(format!("negative or non-finite {} totals", currency));
        }
    }

    Ok(())
}

/// Bring a raw history up to the current shape. Does not roll the day over.
pub fn migrate(raw: RawHistory) -> History {
    let mut total_cost = match raw.total_cost {
        Some(RawTotalCost::Legacy(totals)) => {
            BTreeMap::from([(DEFAULT_CURRENCY.to_string(), totals)])
        }
        Some(RawTotalCost::ByCurrency(map)) => map,
        None => BTreeMap::new(),
    };
    if total_cost.is_empty() {
        total_cost.insert(DEFAULT_CURRENCY.to_string(), CostTotals::default());
    }

    let last_session_date = raw
        .last_session_date
        .as_deref()
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());

    History {
        generations: raw.generations,
        total_cost,
        last_session_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawHistory {
        parse_history(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_legacy_totals_become_usd() {
        let raw = parse(
            r#"{
                "generations": [],
                "totalCost": {"session": 5, "today": 10, "allTime": 20},
                "lastSessionDate": "2026-03-01"
            }"#,
        );
        assert!(matches!(raw.total_cost, Some(RawTotalCost::Legacy(_))));

        let history = migrate(raw);
        assert_eq!(history.total_cost.len(), 1);
        assert_eq!(
            history.total_cost["USD"],
            CostTotals {
                session: 5.0,
                today: 10.0,
                all_time: 20.0
            }
        );
        assert_eq!(
            history.last_session_date,
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
    }

    #[test]
    fn test_currency_map_kept() {
        let history = migrate(parse(
            r#"{
                "generations": [],
                "totalCost": {
                    "USD": {"session": 1, "today": 1, "allTime": 3},
                    "EUR": {"session": 0, "today": 0, "allTime": 2}
                },
                "lastSessionDate": "2026-03-01"
            }"#,
        ));
        assert_eq!(history.total_cost.len(), 2);
        assert_eq!(history.total_cost["EUR"].all_time, 2.0);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let first = migrate(parse(
            r#"{"totalCost": {"session": 1.5, "today": 2.5, "allTime": 9}, "lastSessionDate": "2026-03-01"}"#,
        ));
        let bytes = serde_json::to_vec(&first).unwrap();
        let second = migrate(parse_history(&bytes).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_fields_default() {
        let history = migrate(parse("{}"));
        assert!(history.generations.is_empty());
        assert_eq!(history.total_cost["USD"], CostTotals::default());
        assert_eq!(history.last_session_date, None);
    }

    #[test]
    fn test_unparsable_date_forces_rollover() {
        let mut history = migrate(parse(
            r#"{"totalCost": {"session": 4, "today": 4, "allTime": 4}, "lastSessionDate": "Sun Mar 01 2026"}"#,
        ));
        assert_eq!(history.last_session_date, None);

        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(history.roll_over(today));
        assert_eq!(history.total_cost["USD"].session, 0.0);
        assert_eq!(history.total_cost["USD"].all_time, 4.0);
    }

    #[test]
    fn test_rejects_invalid_documents() {
        assert!(parse_history(b"not json").is_err());
        assert!(parse_history(br#"{"generations": {}}"#).is_err());
        assert!(parse_history(br#"{"totalCost": {"USD": {"allTime": -1}}}"#).is_err());
        assert!(parse_history(
            br#"{"generations": [{"id": "a", "cost": -0.5, "timestamp": "2026-03-01T10:00:00Z"}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_lenient_generation_fields() {
        let raw = parse(
            r#"{"generations": [{"id": "a", "cost": 0.15, "timestamp": "2026-03-01T10:00:00Z"}]}"#,
        );
        assert_eq!(raw.generations[0].prompt, "");
        assert_eq!(raw.generations[0].currency(), "USD");
    }
}
