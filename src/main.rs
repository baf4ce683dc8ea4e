//! Crag-Leader main entry point
//!
//! This is the command-line interface for the Crag-Leader leaderboards.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use crag_leader::config::{load_config_with_hash, Config, Credentials};
use crag_leader::crawler::Coordinator;
use crag_leader::output::{
    format_run, generate_markdown_summary, print_grades, print_leaderboard, print_scrape_report,
    print_summary, print_update_check, Leaderboard, LeaderboardSummary, LogProgress,
};
use crag_leader::storage::{RunStatus, RunSummary, SqliteStorage, Storage};
use crag_leader::{run_with_retry, Crag, CragError, Grade, LeaderboardKind, ScoreCalculator};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Crag-Leader: climbing leaderboards for a crag
///
/// Crag-Leader scrapes a crag's ascent log (or reloads the last scrape),
/// scores every ascent against the configured scoring table and ranks the
/// climbers on several leaderboards.
#[derive(Parser, Debug)]
#[command(name = "crag-leader")]
#[command(version = "1.0.0")]
#[command(about = "Climbing leaderboards for a crag", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Load the last scraped dataset instead of scraping
    #[arg(long)]
    retrieve: bool,

    /// Scrape only if the crag feed shows new routes or ascents since the
    /// last scrape; otherwise load the stored dataset
    #[arg(long, conflicts_with = "retrieve")]
    if_updated: bool,

    /// Show only this leaderboard
    #[arg(long, value_enum)]
    leaderboard: Option<BoardArg>,

    /// Grade for the master-grade leaderboard
    #[arg(long, value_name = "GRADE")]
    grade: Option<String>,

    /// List the grades that can be used with --grade
    #[arg(long)]
    list_grades: bool,

    /// Write every leaderboard to the configured markdown file
    #[arg(long)]
    export_summary: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with_all = ["retrieve", "if_updated", "export_summary", "leaderboard", "list_grades"])]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoardArg {
    Total,
    Volume,
    Unique,
    Master,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    // Fatal errors (bad credentials, corrupt dataset) would only fail again
    let result = run_with_retry(
        config.crawler.pipeline_retry_delay(),
        |e: &anyhow::Error| !is_fatal(e),
        || run_pipeline(&cli, &config, &config_hash),
    )
    .await;

    if let Err(e) = &result {
        log_failure(e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crag_leader=info,warn"),
            1 => EnvFilter::new("crag_leader=debug,info"),
            2 => EnvFilter::new("crag_leader=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn is_fatal(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<CragError>()
        .is_some_and(CragError::is_fatal)
}

fn log_failure(error: &anyhow::Error) {
    if is_fatal(error) {
        tracing::error!("Run aborted: {:#}", error);
    } else {
        tracing::error!("Run failed: {:#}", error);
    }
}

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config) {
    println!("=== Crag-Leader Dry Run ===\n");

    println!("Source:");
    println!("  Crag: {} ({})", config.source.crag_name(), config.source.crag_url);
    println!("  Login: {}", config.source.login_url);

    println!("\nCrawler Configuration:");
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.min_request_interval
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Retry delay: {}ms", config.crawler.retry_delay);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nScoring ({:?}, {:?}):", config.scoring.discipline, config.scoring.combine);
    for (grade, points) in &config.scoring.base_points {
        println!("  {:>6}: {}", grade, points);
    }

    match Credentials::from_env() {
        Ok(credentials) => println!("\n✓ Credentials found for {}", credentials.username),
        Err(e) => println!("\n✗ {}", e),
    }
    println!("✓ Configuration is valid");
}

/// Builds the crag tree, scores it and presents the requested leaderboards
async fn run_pipeline(cli: &Cli, config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let scraped = if cli.retrieve {
        None
    } else {
        handle_scrape(&mut storage, config, config_hash, cli.if_updated, cli.quiet).await?
    };
    let (crag, last_updated) = match scraped {
        Some(scraped) => scraped,
        None => handle_retrieve(&storage, config)?,
    };

    let scoreboard = ScoreCalculator::for_crag(&crag, &config.scoring).calculate(&crag);
    let grades = config.scoring.order_grades(crag.grades());

    if cli.list_grades {
        print_grades(&grades);
    }

    match cli.leaderboard {
        Some(board) => {
            let kind = leaderboard_kind(board, cli.grade.as_deref(), &grades)?;
            print_leaderboard(&Leaderboard {
                entries: scoreboard.leaderboard(&kind),
                kind,
            });
        }
        None if !cli.list_grades && !cli.quiet => {
            print_summary(&LeaderboardSummary::build(&crag, &scoreboard, &[], last_updated));
        }
        None => {}
    }

    if cli.export_summary {
        let summary = LeaderboardSummary::build(&crag, &scoreboard, &grades, last_updated);
        generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;
        println!("✓ Summary exported to: {}", config.output.summary_path);
    }

    Ok(())
}

/// Handles the --retrieve mode: rebuilds the crag from the stored dataset
fn handle_retrieve(
    storage: &SqliteStorage,
    config: &Config,
) -> anyhow::Result<(Crag, Option<chrono::DateTime<Utc>>)> {
    tracing::info!("Loading dataset from {}", config.output.database_path);
    if let Some(run) = storage.get_latest_run()? {
        tracing::info!("Last scrape: {}", format_run(&run));
    }
    let snapshot = storage.read()?;

    if snapshot.rows.is_empty() {
        bail!(
            "No ascents stored in {}; run a scrape first",
            config.output.database_path
        );
    }

    let mut progress = LogProgress::default();
    let crag = Crag::from_rows(
        config.source.crag_name(),
        config.scoring.discipline,
        snapshot.rows,
        &mut progress,
    );

    Ok((crag, snapshot.last_updated))
}

/// Handles the default mode: logs in, scrapes and persists the dataset
///
/// With `if_updated`, the crag feed is read first and `None` is returned
/// when nothing changed since the stored dataset was written.
async fn handle_scrape(
    storage: &mut SqliteStorage,
    config: &Config,
    config_hash: &str,
    if_updated: bool,
    quiet: bool,
) -> anyhow::Result<Option<(Crag, Option<chrono::DateTime<Utc>>)>> {
    let mut coordinator = Coordinator::from_config(config)?;

    let reason = if !if_updated {
        "requested".to_string()
    } else {
        match storage.last_updated()? {
            None => "no stored dataset".to_string(),
            Some(last_updated) => {
                let check = coordinator.check_for_updates(Some(last_updated)).await?;
                if !quiet {
                    print_update_check(&check);
                }
                if !check.has_updates() {
                    tracing::info!(
                        "Dataset from {} is current; skipping scrape",
                        last_updated.format("%Y-%m-%d %H:%M UTC")
                    );
                    return Ok(None);
                }
                check.reason()
            }
        }
    };

    let credentials = Credentials::from_env()?;
    let run_id = storage.create_run(config_hash, &reason)?;
    tracing::info!("Starting scrape run {} of {} ({})", run_id, config.source.crag_url, reason);

    let mut progress = LogProgress::default();
    let outcome = match coordinator
        .login_and_scrape(&config.source.login_url, &credentials, &mut progress)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            storage.finish_run(run_id, RunStatus::Failed, RunSummary::default())?;
            return Err(e.into());
        }
    };

    let rows = outcome.crag.to_rows();
    let summary = RunSummary {
        routes_failed: outcome.report.route_failures.len() as u32,
        ascents: rows.len() as u32,
    };
    let finished = Utc::now();
    storage.save_run(run_id, &rows, finished, summary)?;

    if !quiet {
        print_scrape_report(&outcome.report);
    }

    Ok(Some((outcome.crag, Some(finished))))
}

fn leaderboard_kind(
    board: BoardArg,
    grade: Option<&str>,
    grades: &[Grade],
) -> anyhow::Result<LeaderboardKind> {
    Ok(match board {
        BoardArg::Total => LeaderboardKind::Total,
        BoardArg::Volume => LeaderboardKind::Volume,
        BoardArg::Unique => LeaderboardKind::UniqueAscents,
        BoardArg::Master => {
            let Some(label) = grade else {
                bail!("--leaderboard master needs --grade (see --list-grades)");
            };
            let grade = Grade::new(label);
            if !grades.contains(&grade) {
                let valid: Vec<&str> = grades.iter().map(Grade::as_str).collect();
                bail!("No routes graded {} (valid grades: {})", grade, valid.join(", "));
            }
            LeaderboardKind::MasterGrade(grade)
        }
    })
}
