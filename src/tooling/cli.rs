//! CLI surface for the `reclaim` binary.
//!
//! Subcommands map onto the recovery pipeline: `run` executes the full
//! discover/scan/search/restore/report workflow, `discover` is the
//! report-only variant that never restores, and `init` writes a starter
//! configuration file.

use crate::canvus::CanvusSession;
use crate::config::{RecoveryConfig, DEFAULT_CONFIG_FILE};
use crate::error::RecoveryError;
use crate::logging;
use crate::recovery::{RecoveryPipeline, RestorePolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Reclaim - canvas server asset recovery
#[derive(Parser)]
#[command(name = "reclaim")]
#[command(about = "Discover missing canvas assets and restore them from backup snapshots")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (default: ./reclaim.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log to a file in addition to stderr; without a value the platform
    /// state directory is used
    #[arg(long, num_args = 0..=1, default_missing_value = "", require_equals = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the complete workflow: discover, scan, search backups, restore, report
    Run {
        /// Restore found assets without prompting
        #[arg(long)]
        auto_restore: bool,

        /// Probe the server for each discovered asset hash
        #[arg(long)]
        validate_server: bool,
    },
    /// Discover and report missing assets without restoring anything
    Discover {
        /// Probe the server for each discovered asset hash
        #[arg(long)]
        validate_server: bool,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(cli: Cli) -> Result<(), RecoveryError> {
    let Cli {
        command,
        config,
        log_level,
        log_file,
    } = cli;

    match command {
        Commands::Init { force } => {
            let path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            RecoveryConfig::write_default(&path, force)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        Commands::Run {
            auto_restore,
            validate_server,
        } => {
            let policy = if auto_restore {
                RestorePolicy::Auto
            } else {
                RestorePolicy::Prompt
            };
            run_pipeline(config, log_level, log_file, policy, validate_server).await
        }
        Commands::Discover { validate_server } => {
            run_pipeline(config, log_level, log_file, RestorePolicy::Never, validate_server).await
        }
    }
}

async fn run_pipeline(
    config_path: Option<PathBuf>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    policy: RestorePolicy,
    validate_server: bool,
) -> Result<(), RecoveryError> {
    let mut config = RecoveryConfig::load(config_path.as_deref())?;
    if validate_server {
        config.validation.server_side = true;
    }

    let level = logging::resolve_level(log_level.as_deref(), &config.logging.level);
    let log_file = match log_file {
        // `--log-file` with no value: use the platform default location.
        Some(path) if path.as_os_str().is_empty() => Some(logging::default_log_file()?),
        Some(path) => Some(path),
        None => config.logging.file.clone(),
    };
    logging::init(&level, log_file.as_deref())?;

    config.validate()?;

    let session = CanvusSession::new(
        &config.server.url,
        config.server.timeout_secs,
        config.server.insecure_tls,
    )?;
    let pipeline = RecoveryPipeline::new(config, Arc::new(session), policy);
    let summary = pipeline.run().await?;
    summary.log();
    Ok(())
}
