//! Score calculation for a crag's ascent log
//!
//! This module turns a [`Crag`](crate::model::Crag) into climber standings:
//! - `ScoringTable`: externally supplied grade points, type modifiers and volume bonus
//! - `ScoringStrategy`: per-discipline interpretation of the table
//! - `ScoreCalculator`: one shared per-ascent score table per scoring pass
//! - `Scoreboard`: the four climber aggregates and their leaderboards

mod calculator;
mod table;

pub use calculator::{LeaderboardKind, ScoreCalculator, ScoreRecord, ScoredAscent, Scoreboard};
pub use table::{strategy_for, BoulderingStrategy, Combine, ScoringStrategy, ScoringTable, VolumeBonus};
