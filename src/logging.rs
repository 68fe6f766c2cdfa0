//! Logging setup.
//!
//! `tracing`-based: compact text on stderr, with an optional non-ANSI file
//! writer appended alongside. Level precedence: CLI flag, `RECLAIM_LOG`
//! environment variable, configuration file, then `info`.

use crate::error::RecoveryError;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the effective log level directive.
pub fn resolve_level(cli_level: Option<&str>, config_level: &str) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }
    if let Ok(env_level) = std::env::var("RECLAIM_LOG") {
        if !env_level.is_empty() {
            return env_level;
        }
    }
    config_level.to_string()
}

/// Initialize the global subscriber. Call once, before any pipeline work.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<(), RecoveryError> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| RecoveryError::Config(format!("invalid log level '{}': {}", level, e)))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let file_layer = fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            Registry::default()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| {
                    RecoveryError::Config(format!("failed to initialize logging: {}", e))
                })?;
        }
        None => {
            Registry::default()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|e| {
                    RecoveryError::Config(format!("failed to initialize logging: {}", e))
                })?;
        }
    }
    Ok(())
}

/// Default log file under the platform state directory.
pub fn default_log_file() -> Result<PathBuf, RecoveryError> {
    let project_dirs = directories::ProjectDirs::from("", "reclaim", "reclaim").ok_or_else(|| {
        RecoveryError::Config(
            "could not determine platform state directory for log file".to_string(),
        )
    })?;
    let dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_dir());
    Ok(dir.join("reclaim.log"))
}
