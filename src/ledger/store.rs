use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::migrate::{migrate, parse_history, RawHistory};
use crate::ledger::models::{Generation, History};
use crate::storage::{self, ReadOutcome};

/// Append-only generation history persisted as a single JSON file.
pub struct CostLedger {
    path: PathBuf,
}

impl CostLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history for the current local date.
    ///
    /// Missing or corrupt files yield an empty history. The day rollover is
    /// applied in memory only; it is written back by the next append.
    pub async fn load_history(&self) -> History {
        self.load_history_on(today()).await
    }

    pub async fn load_history_on(&self, today: NaiveDate) -> History {
        match self.read_raw().await {
            ReadOutcome::Loaded(raw) => current(raw, today),
            ReadOutcome::Absent => History::new(today),
            ReadOutcome::Corrupt(reason) => {
                warn!(
                    "History file {} is corrupt, starting fresh: {}",
                    self.path.display(),
                    reason
                );
                History::new(today)
            }
        }
    }

    /// Record a completed generation and persist the ledger.
    ///
    /// Returns the updated history. Write failures are returned to the
    /// caller; a lost cost record is worse than a failed command.
    pub async fn add_generation(&self, generation: Generation) -> Result<History, LedgerError> {
        self.add_generation_on(generation, today()).await
    }

    pub async fn add_generation_on(
        &self,
        generation: Generation,
        today: NaiveDate,
    ) -> Result<History, LedgerError> {
        // Anything written here must load back
        if let Some(cost) = generation.invalid_cost() {
            return Err(LedgerError::InvalidCost {
                id: generation.id,
                cost,
            });
        }

        let mut history = match self.read_raw().await {
            ReadOutcome::Loaded(raw) => current(raw, today),
            ReadOutcome::Absent => History::new(today),
            ReadOutcome::Corrupt(reason) => {
                warn!(
                    "History file {} is corrupt: {}",
                    self.path.display(),
                    reason
                );
                self.backup_corrupt().await?;
                History::new(today)
            }
        };

        debug!(
            "Recording generation {} ({} {})",
            generation.id,
            generation.cost,
            generation.currency()
        );
        history.record(generation, today);

        storage::write_json(&self.path, &history).await?;
        Ok(history)
    }

    pub async fn get_last_generation(&self) -> Option<Generation> {
        self.load_history().await.last().cloned()
    }

    /// Up to `limit` generations, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<Generation> {
        self.load_history()
            .await
            .recent(limit)
            .cloned()
            .collect()
    }

    async fn read_raw(&self) -> ReadOutcome<RawHistory> {
        storage::read(&self.path)
            .await
            .map(|bytes| parse_history(&bytes))
    }

    /// Move a corrupt history file aside so the next write does not destroy it.
    async fn backup_corrupt(&self) -> Result<(), LedgerError> {
        let is_file = fs::metadata(&self.path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Ok(());
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history.json".to_string());
        let backup = self.path.with_file_name(format!(
            "{}.corrupt-{}",
            file_name,
            Local::now().format("%Y%m%d_%H%M%S")
        ));

        fs::rename(&self.path, &backup)
            .await
            .map_err(|source| LedgerError::Backup {
                path: backup.clone(),
                source,
            })?;

        info!("Corrupt history saved to {}", backup.display());
        Ok(())
    }
}

fn current(raw: RawHistory, today: NaiveDate) -> History {
    let mut history = migrate(raw);
    if history.roll_over(today) {
        debug!("New day, session and daily totals reset");
    }
    history
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::ledger::models::CostTotals;
    use crate::pricing::models::{CostEstimate, EstimateSource, EstimateType};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn generation(cost: f64) -> Generation {
        Generation::new(
            "a lighthouse at dusk",
            "banana",
            "/tmp/out.png",
            CostEstimate {
                amount: cost,
                currency: "USD".to_string(),
                unit_quantity: 1.0,
                estimate_type: EstimateType::UnitPrice,
                estimate_source: EstimateSource::Fallback,
                endpoint_id: "fal-ai/nano-banana-pro".to_string(),
                unit_price: None,
            },
        )
    }

    #[tokio::test]
    async fn test_missing_file_gives_default() {
        let dir = TempDir::new().unwrap();
        let ledger = CostLedger::new(dir.path().join("history.json"));

        let history = ledger.load_history_on(day(1)).await;
        assert!(history.generations.is_empty());
        assert_eq!(history.total_cost["USD"], CostTotals::default());
        assert_eq!(history.last_session_date, Some(day(1)));
        assert!(ledger.get_last_generation().await.is_none());
    }

    #[tokio::test]
    async fn test_add_then_get_last() {
        let dir = TempDir::new().unwrap();
        let ledger = CostLedger::new(dir.path().join("history.json"));

        let first = generation(0.15);
        let second = generation(0.03);
        ledger.add_generation(first.clone()).await.unwrap();
        ledger.add_generation(second.clone()).await.unwrap();

        assert_eq!(ledger.get_last_generation().await, Some(second.clone()));
        let recent = ledger.recent(5).await;
        assert_eq!(recent, vec![second, first]);
    }

    #[tokio::test]
    async fn test_append_on_new_day_persists_rollover() {
        let dir = TempDir::new().unwrap();
        let ledger = CostLedger::new(dir.path().join("history.json"));

        ledger.add_generation_on(generation(1.0), day(1)).await.unwrap();
        let history = ledger.add_generation_on(generation(0.5), day(2)).await.unwrap();

        assert_eq!(
            history.total_cost["USD"],
            CostTotals {
                session: 0.5,
                today: 0.5,
                all_time: 1.5
            }
        );
        assert_eq!(ledger.load_history_on(day(2)).await, history);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let ledger = CostLedger::new(&path);

        let loaded = ledger.load_history_on(day(1)).await;
        assert!(loaded.generations.is_empty());
        assert!(path.exists(), "load must not touch the corrupt file");

        ledger.add_generation_on(generation(0.2), day(1)).await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("history.json.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);

        let backup = std::fs::read_to_string(dir.path().join(&backups[0])).unwrap();
        assert_eq!(backup, "{ truncated");
        assert_eq!(ledger.load_history_on(day(1)).await.generations.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_costs_are_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let ledger = CostLedger::new(dir.path().join("history.json"));
        ledger.add_generation_on(generation(5.0), day(1)).await.unwrap();
        let before = std::fs::read(ledger.path()).unwrap();

        for cost in [-1.0, f64::NAN] {
            let err = ledger
                .add_generation_on(generation(cost), day(1))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidCost { .. }));
            assert_eq!(std::fs::read(ledger.path()).unwrap(), before);
        }

        // The ledger still loads and keeps counting from where it was
        let history = ledger.add_generation_on(generation(1.0), day(1)).await.unwrap();
        assert_eq!(history.generations.len(), 2);
        assert_eq!(history.total_cost["USD"].all_time, 6.0);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let ledger = CostLedger::new(blocker.join("history.json"));

        let err = ledger
            .add_generation_on(generation(0.1), day(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Write(StoreError::CreateDir { .. })
        ));
    }
}
