//! `tourney`: run a round-robin tournament described by a JSON settings file.
//!
//! `tourney run settings.json` plays every game with the built-in local
//! runner, appends finished games to the configured output file and prints
//! the final standings. `tourney check settings.json` validates the file and
//! prints one cycle of pairings without playing anything.
//!
//! Progress is logged through `tracing`, to stderr and to a daily log file
//! under [`config::get_log_dir`].

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio_stream::wrappers::BroadcastStream;
use tournament::{PairingScheduler, SettingsError, TournamentError, TournamentSettings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod report;

#[derive(Parser)]
#[command(name = "tourney", about = "Round-robin chess tournament runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a tournament to completion.
    Run {
        /// Path to the tournament settings (JSON).
        settings: PathBuf,
        /// Skip the first N games, restoring them from the output file.
        #[arg(long)]
        resume: Option<u64>,
        /// Games played at the same time. Overrides the settings file.
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Directory for relative output paths.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate a settings file and print the pairings of one cycle.
    Check {
        settings: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("tournament failed: {0}")]
    Tournament(#[from] TournamentError),

    #[error("failed to wait for interrupt signal: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tourney");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            settings,
            resume,
            concurrency,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(config::get_output_dir);
            run(&settings, resume, concurrency, &output_dir).await?;
        }
        Commands::Check { settings } => check(&settings)?,
    }
    Ok(())
}

async fn run(
    settings_path: &Path,
    resume: Option<u64>,
    concurrency: Option<usize>,
    output_dir: &Path,
) -> Result<(), CliError> {
    let mut settings = TournamentSettings::from_file(settings_path)?;
    if let Some(concurrency) = concurrency {
        settings.concurrency = concurrency;
    }
    let resume = resume.unwrap_or(settings.resume);

    let handle = settings
        .builder(output_dir)?
        .spawn_local(settings.runner_config());
    tracing::info!(
        "Running '{}' with {} engines, concurrency {}",
        settings.name,
        settings.engines.len(),
        settings.concurrency
    );

    let (snapshot, events) = handle.subscribe().await?;
    let names = snapshot.standings.iter().map(|s| s.name.clone()).collect();
    let reporter = tokio::spawn(report::log_events(BroadcastStream::new(events), names));

    handle.start(resume).await?;
    let outcome = tokio::select! {
        done = handle.wait() => done,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Interrupted, stopping running games");
            handle.stop().await?;
            handle.wait().await
        }
    };
    handle.shutdown().await;
    let _ = reporter.await;

    let snapshot = outcome?;
    if let Some(error) = &snapshot.error {
        tracing::warn!("Tournament ended with an error: {}", error);
    }
    print!("{}", report::standings_table(&snapshot));
    Ok(())
}

fn check(settings_path: &Path) -> Result<(), CliError> {
    let settings = TournamentSettings::from_file(settings_path)?;
    settings.validate()?;
    settings.adjudicator()?;

    let names: Vec<String> = settings.engines.iter().map(|e| e.name.clone()).collect();
    let mut scheduler = PairingScheduler::new(names.len())?;
    let pairings: Vec<_> = (0..scheduler.games_per_cycle())
        .map(|_| scheduler.next_pair())
        .collect();

    println!(
        "{}: {} engines, {} games per cycle, {} rounds per cycle",
        settings.name,
        names.len(),
        scheduler.games_per_cycle(),
        scheduler.rounds_per_cycle()
    );
    print!("{}", report::schedule_table(&pairings, &names));
    Ok(())
}
