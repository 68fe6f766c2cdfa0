//! Backup snapshot search.
//!
//! Snapshots are dated directories under a single backup root, e.g.
//! `1757261054_2025_09_07_3.3.0_mt-canvus_backup/`. Only the `assets/`
//! subtree of each snapshot is searched, and candidate paths are recorded
//! relative to it so restoration can mirror the live layout. Multiple
//! snapshots routinely carry the same hash; every copy is kept and ranked
//! by modification time, newest first, since the newest backup is the one
//! most likely to match what the server currently expects.

use crate::error::RecoveryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Snapshot directories are recognized by this name fragment.
const SNAPSHOT_DIR_MARKER: &str = "_mt-canvus_backup";

/// Subdirectory of a snapshot that mirrors the live asset tree.
const SNAPSHOT_ASSETS_DIR: &str = "assets";

/// One backup copy of an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    pub path: PathBuf,
    pub hash: String,
    pub extension: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
    /// Relative to the snapshot's `assets/` root.
    pub relative_path: PathBuf,
}

/// Outcome of one backup search.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Hash -> candidate copies; newest first once sorted.
    pub found: HashMap<String, Vec<BackupFile>>,
    /// Requested hashes absent from every snapshot.
    pub missing_hashes: Vec<String>,
    pub snapshots_searched: usize,
    pub files_found: usize,
}

impl SearchResult {
    /// Order each hash's candidates newest-first.
    pub fn sort_candidates(&mut self) {
        for candidates in self.found.values_mut() {
            candidates.sort_by(|a, b| b.modified.cmp(&a.modified));
        }
    }

    /// The newest candidate for `hash`, if any snapshot carried it.
    /// Meaningful after [`sort_candidates`](Self::sort_candidates).
    pub fn best_candidate(&self, hash: &str) -> Option<&BackupFile> {
        self.found.get(hash).and_then(|candidates| candidates.first())
    }
}

/// Searches backup snapshots for missing assets.
pub struct Searcher {
    backup_root: PathBuf,
}

impl Searcher {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
        }
    }

    /// Search every snapshot under the backup root for the requested hashes.
    ///
    /// A missing backup root is not an error: the result is empty and every
    /// requested hash is reported still-missing.
    pub fn search_for_assets(
        &self,
        missing_hashes: &[String],
    ) -> Result<SearchResult, RecoveryError> {
        let mut result = SearchResult::default();
        if missing_hashes.is_empty() {
            info!("no missing assets to search for");
            return Ok(result);
        }

        if !self.backup_root.is_dir() {
            warn!(root = %self.backup_root.display(), "backup root does not exist");
            result.missing_hashes = missing_hashes.to_vec();
            return Ok(result);
        }

        info!(
            hashes = missing_hashes.len(),
            root = %self.backup_root.display(),
            "searching backup snapshots"
        );

        let wanted: HashSet<&str> = missing_hashes.iter().map(String::as_str).collect();
        for assets_root in self.snapshot_assets_roots()? {
            result.snapshots_searched += 1;
            search_snapshot(&assets_root, &wanted, &mut result);
        }

        for hash in missing_hashes {
            if !result.found.contains_key(hash.as_str()) {
                result.missing_hashes.push(hash.clone());
            }
        }

        info!(
            snapshots = result.snapshots_searched,
            files = result.files_found,
            found = result.found.len(),
            still_missing = result.missing_hashes.len(),
            "backup search complete"
        );
        Ok(result)
    }

    /// Immediate subdirectories of the backup root that look like snapshots
    /// and contain an `assets/` subtree.
    fn snapshot_assets_roots(&self) -> Result<Vec<PathBuf>, RecoveryError> {
        let mut roots = Vec::new();
        for entry in fs::read_dir(&self.backup_root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.contains(SNAPSHOT_DIR_MARKER) || !entry.path().is_dir() {
                continue;
            }
            let assets_root = entry.path().join(SNAPSHOT_ASSETS_DIR);
            if assets_root.is_dir() {
                debug!(snapshot = %assets_root.display(), "found snapshot assets root");
                roots.push(assets_root);
            }
        }
        if roots.is_empty() {
            warn!(root = %self.backup_root.display(), "no snapshots with an assets subtree found");
        }
        roots.sort();
        Ok(roots)
    }
}

fn search_snapshot(assets_root: &Path, wanted: &HashSet<&str>, result: &mut SearchResult) {
    for entry in WalkDir::new(assets_root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable entries are skipped; the walk keeps going.
                warn!(error = %e, "skipping unreadable entry in backup snapshot");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !wanted.contains(stem) {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to stat backup file");
                continue;
            }
        };
        let modified = match meta.modified() {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "no modification time for backup file");
                continue;
            }
        };

        let relative_path = entry
            .path()
            .strip_prefix(assets_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        debug!(path = %entry.path().display(), hash = stem, "found backup candidate");
        result.files_found += 1;
        result.found.entry(stem.to_string()).or_default().push(BackupFile {
            path: entry.path().to_path_buf(),
            hash: stem.to_string(),
            extension,
            modified,
            size: meta.len(),
            relative_path,
        });
    }
}
