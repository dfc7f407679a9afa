//! HRMS CLI - developer command-line interface over the HRMS client core.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "hrms")]
#[command(about = "Inspect and drive the HRMS client core", long_about = None)]
#[command(version)]
struct Cli {
    /// Client root holding hrms.toml and the gate file
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Access gate inspection
    Gate {
        #[command(subcommand)]
        command: GateCommands,
    },
    /// Run the session bootstrap against a seeded record service
    Bootstrap {
        /// Seed document (JSON) for the in-memory record service
        #[arg(long)]
        seed: PathBuf,
        /// Subject to sign in as (stays signed out if omitted)
        #[arg(long)]
        subject: Option<String>,
    },
    /// Run a global search against a seeded record service
    Search {
        /// Search term
        term: String,
        /// Seed document (JSON) for the in-memory record service
        #[arg(long)]
        seed: PathBuf,
        /// Subject to search as (must be an administrator)
        #[arg(long)]
        subject: String,
        /// Print the raw results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write hrms.toml with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
enum GateCommands {
    /// Show whether the gate was completed
    Status,
    /// Complete the gate with a name
    Complete {
        /// First name
        first: String,
        /// Last name
        #[arg(default_value = "")]
        last: String,
    },
    /// Forget the gate record
    Reset,
}

fn main() -> Result<()> {
    // Respects RUST_LOG (e.g., RUST_LOG=hrms_core=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.as_path();

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Init { force } => commands::config::init(root, force),
            ConfigCommands::Show => commands::config::show(root),
        },
        Commands::Gate { command } => match command {
            GateCommands::Status => commands::gate::status(root),
            GateCommands::Complete { first, last } => commands::gate::complete(root, &first, &last),
            GateCommands::Reset => commands::gate::reset(root),
        },
        Commands::Bootstrap { seed, subject } => {
            commands::bootstrap::run(root, &seed, subject.as_deref())
        }
        Commands::Search {
            term,
            seed,
            subject,
            json,
        } => commands::search::run(root, &seed, &subject, &term, json),
    }
}
