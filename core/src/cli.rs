use crate::config::{Config, LogFormat, LoggingConfig};
use crate::engine::validator::validate_computation;
use crate::engine::Engine;
use crate::session::Session;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coro")]
#[command(about = "Coro - drive suspendable computations from a session file", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter (overrides config file and env vars)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a session script and print each outcome
    Run {
        /// Session file (.json or .toml)
        session: PathBuf,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the computations of a session without running them
    Check {
        /// Session file (.json or .toml)
        session: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before any command so config errors show up first
    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .log_level(cli.log_level)
        .build()?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Run { session, json } => {
            let session = Session::load(&session)?;
            let mut engine = Engine::new(config.engine);
            let transcript = session.run(&mut engine)?;

            if json {
                let out = serde_json::to_string_pretty(&transcript)
                    .context("Failed to serialize transcript")?;
                println!("{}", out);
            } else {
                print!("{}", transcript);
            }
        }

        Commands::Check { session } => {
            let path = session;
            let session = Session::load(&path)?;

            let mut errors = 0;
            for computation in &session.computations {
                for issue in validate_computation(computation) {
                    if issue.is_error() {
                        errors += 1;
                    }
                    println!("{}", issue);
                }
            }

            if errors > 0 {
                bail!("{}: {} error(s)", path.display(), errors);
            }
            println!(
                "✓ {}: {} computation(s) OK",
                path.display(),
                session.computations.len()
            );
        }
    }

    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
