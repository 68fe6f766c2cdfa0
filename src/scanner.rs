//! Local asset directory scanning.
//!
//! Asset files are content-addressed: the filename stem is the asset hash
//! and the extension is the media container. Anything that does not parse as
//! a hash (thumbnails, stray files, partial downloads) is skipped without
//! error. The scan is read-only.

use crate::error::RecoveryError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const MIN_HASH_LEN: usize = 8;
const MAX_HASH_LEN: usize = 64;

/// One indexed asset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub hash: String,
    pub filename: String,
    pub size: u64,
    /// Path relative to the scanned root; preserves subdirectory layout so
    /// restoration can mirror it.
    pub relative_path: PathBuf,
}

/// Outcome of scanning one asset directory.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub files: Vec<FileInfo>,
    pub hash_index: HashMap<String, FileInfo>,
    pub total_size: u64,
}

/// Extract the asset hash from a filename.
///
/// The extension-stripped stem qualifies when it is 8-64 characters of ASCII
/// alphanumerics; files without an extension never qualify.
pub fn hash_from_filename(filename: &str) -> Option<String> {
    let path = Path::new(filename);
    path.extension()?;
    let stem = path.file_stem()?.to_str()?;

    if stem.len() < MIN_HASH_LEN || stem.len() > MAX_HASH_LEN {
        return None;
    }
    if !stem.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(stem.to_string())
}

/// Recursively scan `root` and index every file whose name parses as a hash.
pub fn scan_assets_dir(root: &Path) -> Result<ScanResult, RecoveryError> {
    if !root.is_dir() {
        return Err(RecoveryError::AssetsDirMissing(root.to_path_buf()));
    }

    let mut result = ScanResult::default();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(info) = file_info_for(root, entry.path()) {
            result.total_size += info.size;
            result.hash_index.insert(info.hash.clone(), info.clone());
            result.files.push(info);
        }
    }

    debug!(
        files = result.files.len(),
        bytes = result.total_size,
        "asset scan complete"
    );
    Ok(result)
}

/// Concurrent variant of [`scan_assets_dir`]: the walk stays sequential, the
/// per-file stat work fans out across a worker pool (`workers == 0` uses the
/// default pool size). File order in the result is unspecified.
pub fn scan_assets_dir_parallel(root: &Path, workers: usize) -> Result<ScanResult, RecoveryError> {
    if !root.is_dir() {
        return Err(RecoveryError::AssetsDirMissing(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| RecoveryError::Config(format!("failed to build scan worker pool: {}", e)))?;
    let files: Vec<FileInfo> =
        pool.install(|| paths.par_iter().filter_map(|path| file_info_for(root, path)).collect());

    let mut result = ScanResult::default();
    for info in files {
        result.total_size += info.size;
        result.hash_index.insert(info.hash.clone(), info.clone());
        result.files.push(info);
    }

    debug!(
        files = result.files.len(),
        bytes = result.total_size,
        workers,
        "parallel asset scan complete"
    );
    Ok(result)
}

fn file_info_for(root: &Path, path: &Path) -> Option<FileInfo> {
    let filename = path.file_name()?.to_str()?.to_string();
    let hash = hash_from_filename(&filename)?;

    let meta = match path.metadata() {
        Ok(meta) => meta,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to stat asset file");
            return None;
        }
    };

    let relative_path = path
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(&filename));

    Some(FileInfo {
        path: path.to_path_buf(),
        hash,
        filename,
        size: meta.len(),
        relative_path,
    })
}

/// Set difference between discovered hashes and the scanned index: a hash is
/// missing iff it was discovered and no local file carries it. Comparison is
/// exact and case-sensitive.
pub fn find_missing_assets(discovered: &[String], scan: &ScanResult) -> Vec<String> {
    discovered
        .iter()
        .filter(|hash| !scan.hash_index.contains_key(hash.as_str()))
        .cloned()
        .collect()
}
