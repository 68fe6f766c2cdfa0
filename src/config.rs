//! Configuration loading and validation.
//!
//! Precedence: built-in defaults, then an optional TOML file (`reclaim.toml`
//! in the working directory, or an explicit `--config` path), then
//! `RECLAIM_`-prefixed environment variables with `__` as the section
//! separator (`RECLAIM_SERVER__URL`, `RECLAIM_PATHS__ASSETS_DIR`, ...).

use crate::error::RecoveryError;
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "reclaim.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub performance: PerformanceConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Canvas server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    /// Accept self-signed certificates. On by default: most deployments this
    /// tool targets terminate TLS locally with their own certificate.
    pub insecure_tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:443".to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
            insecure_tls: true,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Live content-addressed asset directory.
    pub assets_dir: PathBuf,
    /// Directory holding dated backup snapshots.
    pub backup_root: PathBuf,
    /// Where reports are written.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::new(),
            backup_root: PathBuf::new(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Tuning knobs for discovery and scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Ceiling on outbound discovery calls per second.
    pub requests_per_second: usize,
    /// Canvases crawled simultaneously.
    pub max_concurrent_canvases: usize,
    /// Worker threads for the asset scan; 0 scans sequentially.
    pub scan_workers: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            max_concurrent_canvases: 10,
            scan_workers: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Probe the server for each discovered hash after the crawl.
    pub server_side: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
    /// Optional log file written in addition to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl RecoveryConfig {
    /// Load configuration with the default precedence chain. An explicit
    /// `config_file` must exist; the implicit `reclaim.toml` need not.
    pub fn load(config_file: Option<&Path>) -> Result<Self, RecoveryError> {
        let defaults = Config::try_from(&RecoveryConfig::default())
            .map_err(|e| RecoveryError::Config(e.to_string()))?;

        let mut builder = Config::builder().add_source(defaults);
        builder = match config_file {
            Some(path) => {
                builder.add_source(File::from(path.to_path_buf()).format(FileFormat::Toml))
            }
            None => builder.add_source(
                File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
            ),
        };

        let merged = builder
            .add_source(Environment::with_prefix("RECLAIM").separator("__"))
            .build()
            .map_err(|e| RecoveryError::Config(e.to_string()))?;
        merged
            .try_deserialize()
            .map_err(|e| RecoveryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), RecoveryError> {
        if self.server.username.is_empty() {
            return Err(RecoveryError::Config("server.username is required".to_string()));
        }
        if self.server.password.is_empty() {
            return Err(RecoveryError::Config("server.password is required".to_string()));
        }
        if self.paths.assets_dir.as_os_str().is_empty() {
            return Err(RecoveryError::Config("paths.assets_dir is required".to_string()));
        }
        if self.paths.backup_root.as_os_str().is_empty() {
            return Err(RecoveryError::Config("paths.backup_root is required".to_string()));
        }
        if self.performance.requests_per_second == 0 {
            return Err(RecoveryError::Config(
                "performance.requests_per_second must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the default configuration as a starting point for editing.
    pub fn write_default(path: &Path, force: bool) -> Result<(), RecoveryError> {
        if path.exists() && !force {
            return Err(RecoveryError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        let body = toml::to_string_pretty(&RecoveryConfig::default())
            .map_err(|e| RecoveryError::Config(e.to_string()))?;
        std::fs::write(path, body)?;
        Ok(())
    }
}
