//! Crag-Leader: climbing leaderboards from a crag's public ascent log
//!
//! This crate scrapes the ascent log of a single crag, rebuilds it as a
//! crag → boulder → route → ascent tree, scores every ascent against a
//! configurable scoring table and ranks climbers on several leaderboards.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod rank;
pub mod retry;
pub mod score;
pub mod storage;

use thiserror::Error;

/// Main error type for Crag-Leader operations
#[derive(Debug, Error)]
pub enum CragError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Fetch error: {0}")]
    Fetch(crawler::FetchError),

    #[error("Data consistency error: {0}")]
    DataConsistency(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CragError {
    /// Returns true if the error makes the whole run meaningless.
    ///
    /// An authentication failure means no further request can succeed, and a
    /// consistency failure means the model would be scored incompletely.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::DataConsistency(_))
    }
}

impl From<crawler::FetchError> for CragError {
    fn from(err: crawler::FetchError) -> Self {
        if err.is_auth() {
            Self::Auth(err.to_string())
        } else {
            Self::Fetch(err)
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Crag-Leader operations
pub type Result<T> = std::result::Result<T, CragError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Ascent, AscentType, Boulder, Crag, Discipline, Grade, Route};
pub use rank::{rank, RankedEntry};
pub use retry::run_with_retry;
pub use score::{LeaderboardKind, ScoreCalculator, ScoreRecord, Scoreboard, ScoringTable};
