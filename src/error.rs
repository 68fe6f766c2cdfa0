//! Error types for the recovery pipeline.
//!
//! Only unrecoverable failures surface through [`RecoveryError`]; per-item
//! failures during discovery, backup search, and restoration are collected
//! in their respective result structures and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("canvas server request failed: {0}")]
    Api(String),

    #[error("assets directory does not exist: {}", .0.display())]
    AssetsDirMissing(PathBuf),

    #[error("filesystem traversal failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("report generation failed: {0}")]
    Report(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RecoveryError {
    fn from(err: reqwest::Error) -> Self {
        RecoveryError::Api(err.to_string())
    }
}
