//! Folio CLI
//!
//! Command-line reader for Folio - pronoun rewriting and resumable reading.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_core::Config;

mod commands;
mod engine;
mod output;
mod reader;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio - read with live word substitution and remembered positions")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List readable documents (the default)
    #[command(alias = "ls")]
    Catalog,
    /// Read a document
    Read {
        /// Document id from the catalog
        id: String,
        /// Keep the position for this session only
        #[arg(long)]
        session: bool,
    },
    /// Apply the substitution rules to a file (or stdin)
    Rewrite {
        /// File to rewrite
        file: Option<PathBuf>,
    },
    /// Inspect saved reading positions
    Position {
        #[command(subcommand)]
        command: PositionCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum PositionCommands {
    /// Show the saved position of a document
    Show {
        /// Document id
        id: String,
    },
    /// Forget the saved position of a document
    #[command(alias = "rm")]
    Clear {
        /// Document id
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, restore_grace_ms, page_lines, tier, log_file, theme.*)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands load (and may repair) the config themselves
    let command = match cli.command {
        Some(Commands::Config { command }) => {
            return handle_config_command(command, config_path, &output);
        }
        Some(command) => command,
        None => Commands::Catalog,
    };

    let config = Config::load_with_cli_override(config_path)?;
    init_logging(&config);

    match command {
        Commands::Catalog => commands::catalog::list(&config, &output),
        Commands::Read { id, session } => commands::read::read(&config, id, session, &output).await,
        Commands::Rewrite { file } => commands::rewrite::rewrite(&config, file, &output),
        Commands::Position { command } => handle_position_command(command, &config, &output),
        Commands::Config { command } => handle_config_command(command, config_path, &output),
    }
}

fn handle_position_command(command: PositionCommands, config: &Config, output: &Output) -> Result<()> {
    match command {
        PositionCommands::Show { id } => commands::position::show(config, id, output),
        PositionCommands::Clear { id } => commands::position::clear(config, id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize file-based logging
///
/// Only active when FOLIO_LOG is set (e.g. `FOLIO_LOG=debug`). Stdout
/// belongs to the reader view, so logs always go to a file.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("FOLIO_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("folio_core={},folio={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
