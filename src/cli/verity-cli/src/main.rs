//! Verity CLI - Run logins, resolutions and password checks.

mod app;
mod config;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use verity_identity::Credential;
use verity_password_policy::PasswordStatus;

use crate::app::{open_directory, Verity};
use crate::config::VerityConfig;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "verity")]
#[command(about = "Verity - SSO credential validation and identity resolution")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/verity.toml", env = "VERITY_CONFIG")]
    config: PathBuf,

    /// Directory fixture (JSON) backing directory searches
    #[arg(long, env = "VERITY_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate credentials and print the login outcome
    Login {
        /// Username
        #[arg(short, long)]
        username: Option<String>,
        /// Password (read from stdin if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Token credential as ID:SECRET (repeatable)
        #[arg(long = "token")]
        tokens: Vec<String>,
    },
    /// Resolve a principal id against the directory
    Resolve {
        /// Principal id
        id: String,
    },
    /// Show days until a user's password expires
    PasswordStatus {
        /// User id
        user: String,
    },
    /// Validate the configuration
    CheckConfig,
}

// ============================================================================
// Command Handlers
// ============================================================================

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn credentials(username: Option<String>, password: Option<String>, tokens: &[String]) -> Result<Vec<Credential>> {
    let mut credentials = Vec::new();

    if let Some(username) = username {
        let password = match password {
            Some(p) => p,
            None => read_password()?,
        };
        credentials.push(Credential::username_password(username, password)?);
    }
    for token in tokens {
        credentials.push(Credential::parse_token(token).context("Invalid --token value")?);
    }

    if credentials.is_empty() {
        bail!("Provide --username or at least one --token");
    }
    Ok(credentials)
}

async fn cmd_login(verity: &Verity, credentials: Vec<Credential>) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = verity.login(&credentials, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        bail!("Login failed: {}", outcome.code());
    }
    Ok(())
}

async fn cmd_resolve(verity: &Verity, id: &str) -> Result<()> {
    match verity.resolve(id).await? {
        Some(principal) => println!("{}", serde_json::to_string_pretty(&principal)?),
        None => bail!("Principal '{}' not found", id),
    }
    Ok(())
}

async fn cmd_password_status(verity: &Verity, user: &str) -> Result<()> {
    let status = verity.password_status(user).await?;
    match status {
        PasswordStatus::Pass => println!("pass"),
        PasswordStatus::Expiring { days } => println!("{} day(s) until expiration", days),
    }
    Ok(())
}

fn cmd_check_config(verity: &Verity) {
    println!("Configuration OK");
    for line in verity.summary() {
        println!("  {}", line);
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = VerityConfig::load(&cli.config)?;
    let directory = open_directory(cli.directory.as_deref()).await?;
    let verity = Verity::build(&config, directory)?;

    match cli.command {
        Commands::Login {
            username,
            password,
            tokens,
        } => cmd_login(&verity, credentials(username, password, &tokens)?).await,
        Commands::Resolve { id } => cmd_resolve(&verity, &id).await,
        Commands::PasswordStatus { user } => cmd_password_status(&verity, &user).await,
        Commands::CheckConfig => {
            cmd_check_config(&verity);
            Ok(())
        },
    }
}
