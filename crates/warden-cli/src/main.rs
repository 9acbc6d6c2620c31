//! Warden CLI - Inspect and drive access guards from the command line
//!
//! This binary loads the guard definitions of an application, opens its file
//! credential store and lets operators check, set and reset access codes.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_cli::{guards, run_session, WardenConfig};
use warden_core::ValidationResult;

#[derive(Parser)]
#[command(name = "wardenctl")]
#[command(about = "Passcode and biometric access guard tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to $WARDEN_CONFIG or the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show lock and setup state of every guard
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Set the access code of a guard
    SetCode {
        /// Guard identifier
        id: String,

        /// New code in the guard's configured format
        code: String,
    },

    /// Check an access code
    Unlock {
        /// Guard identifier
        id: String,

        /// Code to check
        code: String,
    },

    /// Remove the stored access code of a guard
    Reset {
        /// Guard identifier
        id: String,
    },

    /// Read lock/unlock/background/foreground commands from stdin
    Session,
}

fn load_config(path: &std::path::Path) -> Result<WardenConfig> {
    let config = WardenConfig::load_or_create(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    config
        .ensure_directories()
        .context("Failed to create credential store directory")?;
    Ok(config)
}

/// Output line and exit status for an unlock attempt
fn unlock_report(result: &ValidationResult) -> (String, u8) {
    match result {
        ValidationResult::Valid => ("Valid".to_string(), 0),
        ValidationResult::Invalid { message } => (
            format!(
                "Invalid{}",
                message
                    .as_ref()
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            ),
            1,
        ),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wardenctl=info,warden_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(WardenConfig::default_path);

    match cli.command {
        Commands::Init { force } => {
            if config_path.exists() && !force {
                println!("Config already exists at {:?}", config_path);
                return Ok(ExitCode::SUCCESS);
            }
            let config = WardenConfig::default();
            config
                .save(&config_path)
                .with_context(|| format!("Failed to write config to {:?}", config_path))?;
            info!("Wrote default config to {:?}", config_path);
            println!("Config written to {:?}", config_path);
        }

        Commands::Status { json } => {
            let registry = load_config(&config_path)?.build_registry()?;
            let statuses = guards::status(&registry);
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                println!("Access guards ({}):", statuses.len());
                for status in statuses {
                    println!(
                        "  {:<40} {:<10} {:<9} {}",
                        status.id,
                        status.kind,
                        if status.locked { "locked" } else { "unlocked" },
                        if status.needs_setup { "needs setup" } else { "" }
                    );
                }
            }
        }

        Commands::SetCode { id, code } => {
            let registry = load_config(&config_path)?.build_registry()?;
            guards::set_code(&registry, &id, &code)?;
            println!("Access code set for {}", id);
        }

        Commands::Unlock { id, code } => {
            let registry = load_config(&config_path)?.build_registry()?;
            let result = guards::unlock(&registry, &id, &code).await?;
            let (line, status) = unlock_report(&result);
            println!("{}", line);
            return Ok(ExitCode::from(status));
        }

        Commands::Reset { id } => {
            let registry = load_config(&config_path)?.build_registry()?;
            guards::reset(&registry, &id)?;
            println!("Access code reset for {}", id);
        }

        Commands::Session => {
            let registry = load_config(&config_path)?.build_registry()?;
            println!("Session started; type 'help' for commands");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_session(&registry, stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
