mod commands;
pub mod core;
pub mod ui;

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::error::SyncError;
use crate::core::events::EventSink;
use crate::core::reconcile::ProjectStatus;
use crate::core::rollback::RollbackOutcome;
use crate::core::state::AppState;

const LOG_FILE: &str = "modsync.log";

#[derive(Parser)]
#[command(name = "modsync", version)]
#[command(about = "Download and update the mods, shader packs and resource packs you follow on Modrinth", long_about = None)]
struct Cli {
    /// Settings file (default: <config dir>/modsync/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print plain log lines instead of the progress dashboard
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Install or update every followed project (default)
    Update {
        /// Re-download projects that are already up to date
        #[arg(short, long)]
        force: bool,
    },
    /// Restore the previous version of a project
    Rollback {
        /// Modrinth slug, e.g. `sodium`
        project_slug: String,
    },
    /// Track add-on files that are already installed
    Import,
    /// Show what an update would do, without changing anything
    Status,
}

/// CLI entry point used by the `modsync` binary.
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Update { force: false });

    let dashboard =
        !cli.plain && matches!(command, Command::Update { .. }) && std::io::stderr().is_terminal();
    init_tracing(dashboard);
    info!("modsync {} starting...", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail("Failed to load configuration", e),
    };
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => return fail("Failed to initialize", e),
    };

    match command {
        Command::Update { force } => {
            let (sink, rx) = EventSink::channel();
            let observer = if dashboard {
                tokio::spawn(ui::dashboard::run(rx))
            } else {
                tokio::spawn(ui::plain::run(rx))
            };
            let result = commands::update(&state, force, sink).await;
            let _ = observer.await;
            match result {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => fail("Update failed", e),
            }
        }
        Command::Rollback { project_slug } => {
            match commands::rollback(&state, &project_slug).await {
                Ok(outcome) => {
                    print_rollback(&project_slug, &outcome);
                    ExitCode::SUCCESS
                }
                Err(e) => fail("Rollback failed", e),
            }
        }
        Command::Import => match commands::import(&state).await {
            Ok(report) => {
                println!(
                    "Imported {} of {} files ({} already tracked, {} unknown to Modrinth, {} failed)",
                    report.imported,
                    report.scanned,
                    report.already_tracked,
                    report.unknown,
                    report.failed
                );
                ExitCode::SUCCESS
            }
            Err(e) => fail("Import failed", e),
        },
        Command::Status => match commands::status(&state).await {
            Ok(statuses) => {
                print_status(&statuses);
                ExitCode::SUCCESS
            }
            Err(e) => fail("Status check failed", e),
        },
    }
}

/// `RUST_LOG` wins over the default filter. The dashboard owns the
/// terminal, so in that mode logs go to a file instead.
fn init_tracing(dashboard: bool) {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,modsync_lib=debug"))
    };

    if dashboard {
        match OpenOptions::new().create(true).append(true).open(LOG_FILE) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => eprintln!("Could not open {}: {}; logging to stderr", LOG_FILE, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .init();
}

fn fail(context: &str, err: SyncError) -> ExitCode {
    error!(error = %err, "{}", context);
    eprintln!("{}: {}", context, err);
    ExitCode::FAILURE
}

fn print_rollback(slug: &str, outcome: &RollbackOutcome) {
    match outcome {
        RollbackOutcome::NothingToRollBack => {
            println!("'{}' is not tracked; nothing to roll back", slug)
        }
        RollbackOutcome::Restored {
            title,
            color,
            to_version_id,
            to_version_number,
            ..
        } => {
            let version = if to_version_number.is_empty() {
                to_version_id
            } else {
                to_version_number
            };
            println!(
                "Successfully rolled back {} to version {}",
                ui::colorize(title, *color),
                version
            );
        }
    }
}

fn print_status(statuses: &[ProjectStatus]) {
    if statuses.is_empty() {
        println!("No followed projects found.");
        return;
    }
    for status in statuses {
        let versions = match (&status.installed_version, &status.latest_version) {
            (Some(installed), Some(latest)) if installed != latest => {
                format!("{} -> {}", installed, latest)
            }
            (Some(installed), _) => installed.clone(),
            (None, Some(latest)) => latest.clone(),
            (None, None) => String::new(),
        };
        println!(
            "{:<24} {} {}",
            status.state.to_string(),
            ui::colorize(&status.title, status.color),
            versions
        );
    }
}
