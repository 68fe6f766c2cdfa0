//! Restoration of missing assets from backup copies.
//!
//! Strictly per-asset isolated: one failure marks that hash failed and the
//! rest proceed. An existing destination file is never overwritten (the
//! hash is counted restored and nothing is copied), so re-running after a
//! partial failure or crash is the supported recovery path.

use crate::backup::searcher::{BackupFile, SearchResult};
use crate::error::RecoveryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one restore pass. Accumulates monotonically; there is no
/// rollback on partial failure.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Hashes whose destination file now exists, including idempotent skips.
    pub restored: Vec<String>,
    pub failed: Vec<String>,
    /// Bytes actually copied; skips contribute nothing.
    pub total_bytes: u64,
    pub errors: Vec<String>,
}

/// Copies backup candidates into the live asset directory.
pub struct Restorer {
    assets_dir: PathBuf,
}

impl Restorer {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Restore the best (first, i.e. newest after sorting) candidate for
    /// every found hash. The outer error covers only failure to create the
    /// asset root; per-asset failures land in [`RestoreResult::errors`].
    pub fn restore_assets(&self, search: &SearchResult) -> Result<RestoreResult, RecoveryError> {
        let mut result = RestoreResult::default();
        if search.found.is_empty() {
            info!("no backup files to restore");
            return Ok(result);
        }

        info!(
            assets = search.found.len(),
            dest = %self.assets_dir.display(),
            "restoring assets"
        );
        fs::create_dir_all(&self.assets_dir)?;

        for (hash, candidates) in &search.found {
            let Some(backup) = candidates.first() else {
                continue;
            };
            if let Err(e) = self.restore_one(backup, &mut result) {
                warn!(hash = %hash, error = %e, "failed to restore asset");
                result.failed.push(hash.clone());
                result.errors.push(format!("{}: {}", hash, e));
            }
        }

        info!(
            restored = result.restored.len(),
            failed = result.failed.len(),
            bytes = result.total_bytes,
            "restoration complete"
        );
        Ok(result)
    }

    fn restore_one(&self, backup: &BackupFile, result: &mut RestoreResult) -> io::Result<()> {
        let dest = self.assets_dir.join(&backup.relative_path);

        if dest.exists() {
            debug!(dest = %dest.display(), "asset already present, skipping");
            result.restored.push(backup.hash.clone());
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_durable(&backup.path, &dest)?;

        debug!(src = %backup.path.display(), dest = %dest.display(), "restored asset");
        result.restored.push(backup.hash.clone());
        result.total_bytes += backup.size;
        Ok(())
    }
}

/// Byte-for-byte copy, flushed to disk before returning.
fn copy_durable(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = fs::File::open(src)?;
    let mut writer = fs::File::create(dest)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()
}
