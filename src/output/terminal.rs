//! Terminal presentation of leaderboards and scrape results

use crate::crawler::{ScrapeReport, UpdateCheck};
use crate::model::{Grade, Progress};
use crate::output::traits::{format_value, Leaderboard, LeaderboardSummary};
use crate::score::LeaderboardKind;
use crate::storage::RunRecord;

/// Formats one leaderboard as a fixed-width table
pub fn format_leaderboard(board: &Leaderboard) -> String {
    let mut out = format!("=== {} ===\n", board.kind);

    if board.entries.is_empty() {
        out.push_str("  (no climbers)\n");
        return out;
    }

    let width = board
        .entries
        .iter()
        .map(|e| e.climber.chars().count())
        .max()
        .unwrap_or(0)
        .max("Climber".len());

    out.push_str(&format!("{:>4}  {:<width$}  {:>8}\n", "Rank", "Climber", value_header(&board.kind)));
    for entry in &board.entries {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>8}\n",
            entry.rank,
            entry.climber,
            format_value(entry.value)
        ));
    }
    out
}

fn value_header(kind: &LeaderboardKind) -> &'static str {
    match kind {
        LeaderboardKind::UniqueAscents => "Routes",
        LeaderboardKind::Volume => "Volume",
        _ => "Score",
    }
}

/// Prints one leaderboard
pub fn print_leaderboard(board: &Leaderboard) {
    println!("{}", format_leaderboard(board));
}

/// Prints the header facts and every leaderboard in the summary
pub fn print_summary(summary: &LeaderboardSummary) {
    println!("Crag: {}", summary.crag);
    println!(
        "  {} boulders, {} routes, {} ascents, {} climbers",
        summary.boulders, summary.routes, summary.ascents, summary.climbers
    );
    if let Some(updated) = summary.last_updated {
        println!("  Last updated: {}", updated.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();

    for board in &summary.leaderboards {
        print_leaderboard(board);
    }
}

/// Prints the grades that can be chosen for the master-grade leaderboard
pub fn print_grades(grades: &[Grade]) {
    println!("Valid grades:");
    let labels: Vec<&str> = grades.iter().map(Grade::as_str).collect();
    println!("  {}", labels.join(", "));
}

/// Prints what happened during a scrape
pub fn print_scrape_report(report: &ScrapeReport) {
    println!("=== Scrape Report ===\n");
    println!("  Boulders: {}", report.boulders_seen);
    println!("  Routes: {}", report.routes_seen);
    println!("  Ascents parsed: {}", report.ascents_parsed);
    println!("  Entries skipped: {}", report.entries_skipped);
    println!("  Requests: {}", report.requests);
    println!("  Duration: {:.1}s", report.duration.as_secs_f64());
    println!();

    if !report.boulder_failures.is_empty() {
        println!("Failed Boulders ({}):", report.boulder_failures.len());
        for failure in &report.boulder_failures {
            println!("  {} - {}", failure.name, failure.reason);
        }
        println!();
    }

    if !report.route_failures.is_empty() {
        println!("Failed Routes ({}):", report.route_failures.len());
        for failure in &report.route_failures {
            println!("  {} - {}", failure.name, failure.reason);
        }
        println!();
    }

    if !report.mismatches.is_empty() {
        println!("Count Mismatches ({}):", report.mismatches.len());
        for m in &report.mismatches {
            println!(
                "  {} / {}: site shows {}, parsed {}",
                m.boulder, m.route, m.reported, m.parsed
            );
        }
        println!();
    }
}

/// Prints the feed items that triggered (or did not trigger) a scrape
pub fn print_update_check(check: &UpdateCheck) {
    if !check.has_updates() {
        println!("No new routes or ascents in the last {} feed items", check.items_seen);
        return;
    }

    println!("Updates found ({}):", check.updates.len());
    for item in check.updates.iter().take(3) {
        println!("  {}", item.describe());
    }
    if check.updates.len() > 3 {
        println!("  ... and {} more", check.updates.len() - 3);
    }
    println!();
}

/// Formats the one-line description of a stored scrape run
pub fn format_run(run: &RunRecord) -> String {
    let mut line = format!(
        "Run #{} ({}) started {}",
        run.id,
        run.status.to_db_string(),
        run.started_at
    );
    if let Some(ms) = run.duration_ms {
        line.push_str(&format!(", took {:.1}s", ms as f64 / 1000.0));
    }
    line.push_str(&format!(", {} ascents", run.ascents));
    if run.routes_failed > 0 {
        line.push_str(&format!(", {} routes failed", run.routes_failed));
    }
    if !run.reason.is_empty() {
        line.push_str(&format!(" [{}]", run.reason));
    }
    line
}

/// Progress sink that logs every tenth of the way through the crag
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: usize,
}

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        self.last_decile = 0;
        tracing::info!("Processing {} boulders", total);
    }

    fn advance(&mut self, completed: usize, total: usize) {
        let decile = completed * 10 / total.max(1);
        if decile > self.last_decile || completed == total {
            self.last_decile = decile;
            tracing::info!("Progress: {}/{} boulders", completed, total);
        }
    }

    fn finish(&mut self) {
        tracing::debug!("Crag tree complete");
    }
}
