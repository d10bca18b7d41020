//! # sudoku-sync
//!
//! Command-line front end for the sudoku sync engine.
//!
//! ## Commands
//!
//! - `check`: Validate an answer grid against its puzzle
//! - `cheat`: Run the cheat heuristic over a saved game
//! - `score`: Build the leaderboard from a JSON export
//! - `sessions`: List sessions in the local store
//!
//! ## Example
//!
//! ```bash
//! # Check an answer
//! sudoku-sync check --initial 53..7.... --solution 534678912... 534.7....
//!
//! # Check one cell
//! sudoku-sync check --cell box:0,0,cell:2,0 --initial ... --solution ... ...
//!
//! # Rank yourself against your friends
//! sudoku-sync score export.json
//!
//! # Inspect saved sessions
//! sudoku-sync sessions --data-dir ./data
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{cheat, check, score, sessions};

/// Command-line front end for the sudoku sync engine.
#[derive(Parser, Debug)]
#[command(name = "sudoku-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the local session store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an answer grid against its puzzle
    Check {
        /// Puzzle text of the initial grid (81 chars, `.` or `0` for empty)
        #[arg(long)]
        initial: String,

        /// Puzzle text of the solution
        #[arg(long)]
        solution: String,

        /// Puzzle text of the answer to check
        answer: String,

        /// Judge only this cell (`box:X,Y,cell:x,y`)
        #[arg(long)]
        cell: Option<String>,
    },

    /// Run the cheat heuristic over a saved game (JSON)
    Cheat {
        /// Game state file
        file: PathBuf,
    },

    /// Build the leaderboard from a JSON export
    Score {
        /// Export file
        file: PathBuf,

        /// Score as of this Unix time in seconds (default: now)
        #[arg(long)]
        now: Option<u64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List sessions in the local store
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine_config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check {
            initial,
            solution,
            answer,
            cell,
        } => {
            check::run(&initial, &solution, &answer, cell.as_deref())?;
        }
        Commands::Cheat { file } => {
            cheat::run(&file).await?;
        }
        Commands::Score { file, now, json } => {
            score::run(&file, now, json).await?;
        }
        Commands::Sessions => {
            let data_dir = match cli.data_dir.or_else(|| engine_config.storage.data_dir.clone()) {
                Some(dir) => dir,
                None => default_data_dir()?,
            };
            sessions::run(&data_dir, &engine_config.storage)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for sudoku-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "bubblyclouds", "sudoku-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
