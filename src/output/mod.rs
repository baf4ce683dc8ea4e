//! Output module for presenting leaderboards
//!
//! This module handles:
//! - Collecting every leaderboard of a scoring pass into one summary
//! - Printing leaderboards, valid grades and scrape reports to the terminal
//! - Exporting the summary as markdown
//! - Logging scrape progress

mod markdown;
mod terminal;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use terminal::{
    format_leaderboard, format_run, print_grades, print_leaderboard, print_scrape_report,
    print_summary, print_update_check, LogProgress,
};
pub use traits::{format_value, Leaderboard, LeaderboardSummary, OutputError, OutputResult};
