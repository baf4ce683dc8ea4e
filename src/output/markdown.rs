//! Markdown summary generation
//!
//! This module writes every leaderboard of a scoring pass to a markdown file
//! that can be published or shared.

use crate::output::traits::{format_value, LeaderboardSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the summary as markdown to `output_path`
///
/// Missing parent directories are created.
pub fn generate_markdown_summary(summary: &LeaderboardSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote leaderboard summary to {}", output_path.display());
    Ok(())
}

/// Formats the summary as markdown
pub fn format_markdown_summary(summary: &LeaderboardSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {} Leaderboards\n\n", summary.crag));

    md.push_str("## Dataset\n\n");
    md.push_str(&format!("- **Boulders**: {}\n", summary.boulders));
    md.push_str(&format!("- **Routes**: {}\n", summary.routes));
    md.push_str(&format!("- **Ascents**: {}\n", summary.ascents));
    md.push_str(&format!("- **Climbers**: {}\n", summary.climbers));
    if let Some(updated) = summary.last_updated {
        md.push_str(&format!(
            "- **Last Updated**: {}\n",
            updated.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    md.push('\n');

    for board in &summary.leaderboards {
        md.push_str(&format!("## {}\n\n", board.kind));

        if board.entries.is_empty() {
            md.push_str("_No ascents._\n\n");
            continue;
        }

        md.push_str("| Rank | Climber | Value |\n");
        md.push_str("|------|---------|-------|\n");
        for entry in &board.entries {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                entry.rank,
                entry.climber.replace('|', "\\|"),
                format_value(entry.value)
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Generated by Crag-Leader on {}*\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md
}
