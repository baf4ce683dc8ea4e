//! Output error types and the leaderboard summary
//!
//! The summary collects every leaderboard for one scoring pass so the
//! terminal and markdown renderers print the same numbers.

use crate::model::{Crag, Grade};
use crate::rank::RankedEntry;
use crate::score::{LeaderboardKind, Scoreboard};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One ranked leaderboard
#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub entries: Vec<RankedEntry<f64>>,
}

/// Every leaderboard for a crag, plus the facts shown above them
#[derive(Debug, Clone)]
pub struct LeaderboardSummary {
    pub crag: String,
    pub boulders: usize,
    pub routes: usize,
    pub ascents: usize,
    pub climbers: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub leaderboards: Vec<Leaderboard>,
}

impl LeaderboardSummary {
    /// Ranks the total, volume and unique-ascent boards, then one master-grade
    /// board per grade in `grades` (in that order)
    pub fn build(
        crag: &Crag,
        scoreboard: &Scoreboard,
        grades: &[Grade],
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        let kinds = [
            LeaderboardKind::Total,
            LeaderboardKind::Volume,
            LeaderboardKind::UniqueAscents,
        ]
        .into_iter()
        .chain(grades.iter().cloned().map(LeaderboardKind::MasterGrade));

        let leaderboards = kinds
            .map(|kind| Leaderboard {
                entries: scoreboard.leaderboard(&kind),
                kind,
            })
            .collect();

        Self {
            crag: crag.name.clone(),
            boulders: crag.boulders.len(),
            routes: crag.route_count(),
            ascents: crag.ascent_count(),
            climbers: scoreboard.records().len(),
            last_updated,
            leaderboards,
        }
    }
}

/// Formats a leaderboard value; counts and whole scores print without decimals
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
