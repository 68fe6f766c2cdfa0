//! Recovery pipeline orchestration.
//!
//! Sequences the run: Authenticating → Discovering → Scanning → Diffing →
//! (NoMissing | SearchingBackups) → (Restoring)? → Reporting → Done. The
//! orchestrator owns no domain logic: every stage delegates to its
//! component and the outcome is aggregated into a [`RunSummary`].
//!
//! Unrecoverable errors before the diff abort the run; everything after is
//! per-item isolated, and rerunning the pipeline is always safe (restoration
//! skips files that already exist).

pub mod report;

use crate::backup::{Restorer, Searcher};
use crate::canvus::{
    discover_with_cap, validate_assets_on_server, AssetInfo, CanvusApi, ServerValidationResult,
};
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::scanner;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Restoration policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePolicy {
    /// Ask the operator before restoring.
    Prompt,
    /// Restore without asking.
    Auto,
    /// Never restore (report-only mode).
    Never,
}

/// End-of-run counters, logged and returned to the caller.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub canvases: usize,
    pub total_assets: usize,
    pub unique_assets: usize,
    pub local_files: usize,
    pub local_bytes: u64,
    pub missing: usize,
    pub found_in_backup: usize,
    pub still_missing: usize,
    pub restored: usize,
    pub failed: usize,
    pub bytes_restored: u64,
    pub soft_errors: usize,
    pub server_validation: Option<ServerValidationResult>,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            canvases = self.canvases,
            total_assets = self.total_assets,
            unique_assets = self.unique_assets,
            local_files = self.local_files,
            local_mb = self.local_bytes / (1024 * 1024),
            missing = self.missing,
            found_in_backup = self.found_in_backup,
            still_missing = self.still_missing,
            restored = self.restored,
            failed = self.failed,
            bytes_restored = self.bytes_restored,
            soft_errors = self.soft_errors,
            "run summary"
        );
        if let Some(validation) = &self.server_validation {
            info!(
                existing = validation.existing_assets,
                missing = validation.missing_assets,
                "server validation summary"
            );
        }
    }
}

/// Drives one recovery run end to end.
pub struct RecoveryPipeline {
    config: RecoveryConfig,
    api: Arc<dyn CanvusApi>,
    policy: RestorePolicy,
}

impl RecoveryPipeline {
    pub fn new(config: RecoveryConfig, api: Arc<dyn CanvusApi>, policy: RestorePolicy) -> Self {
        Self { config, api, policy }
    }

    pub async fn run(&self) -> Result<RunSummary, RecoveryError> {
        info!(server = %self.config.server.url, "authenticating");
        self.api
            .login(&self.config.server.username, &self.config.server.password)
            .await?;

        let outcome = self.run_authenticated().await;

        // Best-effort: the run's outcome does not depend on logout.
        if let Err(e) = self.api.logout().await {
            debug!(error = %e, "logout failed");
        }
        outcome
    }

    async fn run_authenticated(&self) -> Result<RunSummary, RecoveryError> {
        // Discovering
        let mut discovery = discover_with_cap(
            Arc::clone(&self.api),
            self.config.performance.requests_per_second,
            self.config.performance.max_concurrent_canvases,
        )
        .await?;
        for soft_error in &discovery.errors {
            warn!(error = %soft_error, "discovery soft error");
        }

        if self.config.validation.server_side {
            info!("validating discovered assets on the server");
            let validation = validate_assets_on_server(self.api.as_ref(), &discovery.assets).await;
            info!(
                existing = validation.existing_assets,
                total = validation.total_assets,
                "server validation complete"
            );
            discovery.server_validation = Some(validation);
        }

        let unique = discovery.unique_assets();
        info!(
            canvases = discovery.canvases.len(),
            assets = discovery.assets.len(),
            unique = unique.len(),
            "discovery complete"
        );

        // Scanning
        info!(dir = %self.config.paths.assets_dir.display(), "scanning assets directory");
        let scan = if self.config.performance.scan_workers > 0 {
            scanner::scan_assets_dir_parallel(
                &self.config.paths.assets_dir,
                self.config.performance.scan_workers,
            )?
        } else {
            scanner::scan_assets_dir(&self.config.paths.assets_dir)?
        };

        // Diffing
        let discovered: Vec<String> = unique.iter().map(|a| a.hash.clone()).collect();
        let missing = scanner::find_missing_assets(&discovered, &scan);
        info!(
            local_files = scan.files.len(),
            missing = missing.len(),
            "computed missing set"
        );

        let mut summary = RunSummary {
            canvases: discovery.canvases.len(),
            total_assets: discovery.assets.len(),
            unique_assets: unique.len(),
            local_files: scan.files.len(),
            local_bytes: scan.total_size,
            missing: missing.len(),
            soft_errors: discovery.errors.len(),
            server_validation: discovery.server_validation.clone(),
            ..RunSummary::default()
        };

        if missing.is_empty() {
            info!("no missing assets; all referenced assets are present locally");
            return Ok(summary);
        }

        // SearchingBackups
        let searcher = Searcher::new(&self.config.paths.backup_root);
        let mut search = searcher.search_for_assets(&missing)?;
        search.sort_candidates();
        summary.found_in_backup = search.found.len();
        summary.still_missing = search.missing_hashes.len();

        // Restoring (conditional on policy and at least one match)
        if !search.found.is_empty() && self.should_restore(search.found.len())? {
            let restorer = Restorer::new(&self.config.paths.assets_dir);
            let restore = restorer.restore_assets(&search)?;
            summary.restored = restore.restored.len();
            summary.failed = restore.failed.len();
            summary.bytes_restored = restore.total_bytes;
        } else {
            info!("skipping restoration");
        }

        // Reporting
        let missing_infos = missing_asset_infos(&unique, &missing);
        report::write_reports(&self.config.paths.output_dir, &missing_infos, &search)?;

        Ok(summary)
    }

    fn should_restore(&self, found: usize) -> Result<bool, RecoveryError> {
        match self.policy {
            RestorePolicy::Auto => {
                info!(found, "auto-restore enabled");
                Ok(true)
            }
            RestorePolicy::Never => Ok(false),
            RestorePolicy::Prompt => {
                use dialoguer::Confirm;
                Confirm::new()
                    .with_prompt(format!("Restore {} assets found in backups?", found))
                    .default(false)
                    .interact()
                    .map_err(|e| {
                        RecoveryError::Config(format!("failed to read confirmation: {}", e))
                    })
            }
        }
    }
}

/// One representative record per missing hash, for reporting.
fn missing_asset_infos(unique: &[AssetInfo], missing: &[String]) -> Vec<AssetInfo> {
    let missing_set: HashSet<&str> = missing.iter().map(String::as_str).collect();
    unique
        .iter()
        .filter(|asset| missing_set.contains(asset.hash.as_str()))
        .cloned()
        .collect()
}
