//! Auto Parts CLI - account and session commands for the Auto Parts shop.
//!
//! Each invocation restores the persisted session, runs one command through
//! the session controller and exits.

mod app;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autoparts_core::Config;

use app::App;

// ============================================================================
// Constants
// ============================================================================

/// Log file name inside the data directory
const LOG_FILE: &str = "autoparts.log";

#[derive(Debug, Parser)]
#[command(name = "autoparts", version, about = "Sign in to the Auto Parts shop")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and keep the session for later commands
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Show the signed-in user's profile
    Profile,
    /// Sign out and forget the stored session
    Logout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the session state as JSON
    Status,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr unless `log_to_file` is set. The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.log_to_file {
        let log_dir = config
            .data_dir()
            .ok()
            .filter(|dir| std::fs::create_dir_all(dir).is_ok());
        if let Some(dir) = log_dir {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            return Some(guard);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
    None
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => {
            let mut config = Config::default();
            config.apply_overrides(|key| std::env::var(key).ok());
            (config, Some(e))
        }
    };

    let _log_guard = init_tracing(&config);
    let config_writable = config_error.is_none();
    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "Failed to load config, using defaults");
    }
    info!(api_url = %config.api_url, "Auto Parts CLI starting");

    match run(cli.command, config, config_writable).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Dispatch one command. `Ok(false)` is a failure already reported to the user.
async fn run(command: Command, config: Config, config_writable: bool) -> Result<bool> {
    let mut app = App::new(config, config_writable).await?;

    match command {
        Command::Login { username } => app.login(username).await,
        Command::Register { username, email } => app.register(username, email).await,
        Command::Profile => app.profile().await,
        Command::Logout { yes } => app.logout(yes).await,
        Command::Status => app.status(),
    }
}
