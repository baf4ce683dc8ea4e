//! Storage module for persisting the scraped dataset
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Replacing and reading back the flattened ascent rows
//! - Scrape run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Snapshot, Storage, StorageError, StorageResult};

/// Represents a scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub config_hash: String,
    /// Why the scrape was started
    pub reason: String,
    pub status: RunStatus,
    pub routes_failed: u32,
    pub ascents: u32,
}

/// Counters recorded when a run finishes
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub routes_failed: u32,
    pub ascents: u32,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
