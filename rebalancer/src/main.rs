//! CLI entry point for the vault rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use vaultbook_rebalancer::config::Config;
use vaultbook_rebalancer::error::Error;
use vaultbook_rebalancer::execution::{self, RunOptions};
use vaultbook_rebalancer::feed::GradeFeed;
use vaultbook_rebalancer::snapshot::VaultSnapshot;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Grade-driven vault rebalancer: investor grades → swap orders")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the target allocation implied by a grade feed
    Allocate {
        /// Path to grades.json
        grades: PathBuf,
    },

    /// Show valuation, adjustments and orders without submitting
    Plan {
        /// Path to grades.json
        grades: PathBuf,
        /// Path to snapshot.json
        snapshot: PathBuf,
    },

    /// Compute the plan, confirm, and queue orders in the outbox
    Run {
        /// Path to grades.json
        grades: PathBuf,
        /// Path to snapshot.json
        snapshot: PathBuf,

        /// Show plan without submitting
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Show the vault's current distribution
    Distribution {
        /// Path to snapshot.json
        snapshot: PathBuf,
    },

    /// Compare current distribution vs target
    Reconcile {
        /// Path to grades.json
        grades: PathBuf,
        /// Path to snapshot.json
        snapshot: PathBuf,
    },
}

fn load_or_exit<T>(what: &str, path: &Path, load: impl FnOnce(&Path) -> Result<T, Error>) -> T {
    match load(path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error loading {what}: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = load_or_exit("config", &cli.config, Config::load);

    let result = match cli.command {
        Command::Allocate { grades } => {
            let feed = load_or_exit("grades", &grades, GradeFeed::load);
            execution::show_allocation(&config, &feed)
        }
        Command::Plan { grades, snapshot } => {
            let feed = load_or_exit("grades", &grades, GradeFeed::load);
            let snap = load_or_exit("snapshot", &snapshot, VaultSnapshot::load);
            execution::show_plan(&config, &feed, &snap)
        }
        Command::Run {
            grades,
            snapshot,
            dry_run,
            force,
        } => {
            let feed = load_or_exit("grades", &grades, GradeFeed::load);
            let snap = load_or_exit("snapshot", &snapshot, VaultSnapshot::load);
            let opts = RunOptions {
                dry_run,
                force,
                run_id: chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string(),
            };
            execution::run(&config, &feed, &snap, &opts)
        }
        Command::Distribution { snapshot } => {
            let snap = load_or_exit("snapshot", &snapshot, VaultSnapshot::load);
            execution::show_distribution(&config, &snap)
        }
        Command::Reconcile { grades, snapshot } => {
            let feed = load_or_exit("grades", &grades, GradeFeed::load);
            let snap = load_or_exit("snapshot", &snapshot, VaultSnapshot::load);
            execution::run_reconcile(&config, &feed, &snap)
        }
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => eprintln!("\nAborted: {msg}"),
            _ => eprintln!("Error: {e}"),
        }
        process::exit(exit_code(&e));
    }
}

/// Process exit status for a failed command.
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Aborted(_) => 2,
        _ => 1,
    }
}
