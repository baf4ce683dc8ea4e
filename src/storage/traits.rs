//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{AscentRow, RawAscentRow};
use crate::storage::{RunRecord, RunStatus, RunSummary};
use crate::CragError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A dataset as read back from storage
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rows: Vec<AscentRow>,
    /// When the rows were last written, if ever
    pub last_updated: Option<DateTime<Utc>>,
}

/// Trait for storage backend implementations
///
/// This trait defines the persisted dataset (flattened ascent rows plus a
/// last-updated timestamp) and the scrape run history.
pub trait Storage {
    // ===== Dataset =====

    /// Reads every persisted row without validating it
    fn read_raw(&self) -> StorageResult<Vec<RawAscentRow>>;

    /// Returns when the dataset was last written
    fn last_updated(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Replaces every persisted row and stamps the dataset with `timestamp`
    ///
    /// Either all rows are replaced or none are.
    fn write(&mut self, rows: &[AscentRow], timestamp: DateTime<Utc>) -> StorageResult<()>;

    /// Reads and validates the dataset
    ///
    /// A row with a missing or unreadable field fails the whole read with
    /// [`CragError::DataConsistency`], since scoring an incomplete model would
    /// be wrong.
    fn read(&self) -> Result<Snapshot, CragError> {
        let rows = self
            .read_raw()?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_row(index + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            rows,
            last_updated: self.last_updated()?,
        })
    }

    // ===== Run Management =====

    /// Creates a new scrape run, recording why it was started
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, reason: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus, summary: RunSummary) -> StorageResult<()>;

    /// Writes a scraped dataset and closes its run
    ///
    /// A failed write marks the run failed and returns the write error.
    fn save_run(
        &mut self,
        run_id: i64,
        rows: &[AscentRow],
        timestamp: DateTime<Utc>,
        summary: RunSummary,
    ) -> StorageResult<()> {
        if let Err(e) = self.write(rows, timestamp) {
            self.finish_run(run_id, RunStatus::Failed, summary)?;
            return Err(e);
        }
        self.finish_run(run_id, RunStatus::Completed, summary)
    }
}
