//! Missing-asset report generation.
//!
//! Two artifacts per run: a human-readable text report grouping missing
//! assets by canvas, and a CSV with one row per missing asset. Rows and
//! canvas groups are sorted so reruns produce byte-identical reports.

use crate::backup::SearchResult;
use crate::canvus::AssetInfo;
use crate::error::RecoveryError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TEXT_REPORT_FILENAME: &str = "missing_assets_report.txt";
pub const CSV_REPORT_FILENAME: &str = "missing_assets.csv";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write both reports into `output_dir` (created if absent) and return
/// their paths.
pub fn write_reports(
    output_dir: &Path,
    missing: &[AssetInfo],
    search: &SearchResult,
) -> Result<(PathBuf, PathBuf), RecoveryError> {
    fs::create_dir_all(output_dir)?;

    let text_path = output_dir.join(TEXT_REPORT_FILENAME);
    write_text_report(&text_path, missing, search)?;

    let csv_path = output_dir.join(CSV_REPORT_FILENAME);
    write_csv_report(&csv_path, missing, search)?;

    info!(
        text = %text_path.display(),
        csv = %csv_path.display(),
        "reports written"
    );
    Ok((text_path, csv_path))
}

fn write_text_report(
    path: &Path,
    missing: &[AssetInfo],
    search: &SearchResult,
) -> Result<(), RecoveryError> {
    let mut by_canvas: BTreeMap<&str, Vec<&AssetInfo>> = BTreeMap::new();
    for asset in missing {
        by_canvas.entry(asset.canvas_name.as_str()).or_default().push(asset);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Reclaim - Missing Assets Report");
    let _ = writeln!(out, "Generated: {}", Utc::now().format(TIME_FORMAT));
    let _ = writeln!(out, "Total Missing Assets: {}\n", missing.len());

    for (canvas_name, assets) in &by_canvas {
        let _ = writeln!(out, "Canvas: {} (ID: {})", canvas_name, assets[0].canvas_id);
        for asset in assets {
            let _ = writeln!(
                out,
                "  Widget: {} (ID: {}, Type: {})",
                asset.widget_name, asset.widget_id, asset.widget_type
            );
            let _ = writeln!(out, "    Hash: {}", asset.hash);
            if !asset.original_filename.is_empty() {
                let _ = writeln!(out, "    Original Filename: {}", asset.original_filename);
            }
            match search.best_candidate(&asset.hash) {
                Some(backup) => {
                    let _ = writeln!(out, "    Backup Status: found in backup");
                    let _ = writeln!(out, "    Backup Path: {}", backup.path.display());
                    let _ = writeln!(out, "    Backup Size: {} bytes", backup.size);
                    let _ = writeln!(
                        out,
                        "    Backup Modified: {}",
                        backup.modified.format(TIME_FORMAT)
                    );
                }
                None => {
                    let _ = writeln!(out, "    Backup Status: not found in any backup");
                }
            }
            out.push('\n');
        }
    }

    fs::write(path, out)?;
    Ok(())
}

fn write_csv_report(
    path: &Path,
    missing: &[AssetInfo],
    search: &SearchResult,
) -> Result<(), RecoveryError> {
    let mut rows: Vec<&AssetInfo> = missing.iter().collect();
    rows.sort_by(|a, b| {
        (a.canvas_name.as_str(), a.hash.as_str()).cmp(&(b.canvas_name.as_str(), b.hash.as_str()))
    });

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Hash",
        "WidgetType",
        "OriginalFilename",
        "CanvasID",
        "CanvasName",
        "WidgetID",
        "WidgetName",
        "BackupStatus",
        "BackupPath",
        "BackupSize",
        "BackupModified",
    ])?;

    for asset in rows {
        let (status, backup_path, backup_size, backup_modified) =
            match search.best_candidate(&asset.hash) {
                Some(backup) => (
                    "Found".to_string(),
                    backup.path.display().to_string(),
                    backup.size.to_string(),
                    backup.modified.format(TIME_FORMAT).to_string(),
                ),
                None => (
                    "Not Found".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ),
            };

        writer.write_record([
            asset.hash.as_str(),
            &asset.widget_type.to_string(),
            asset.original_filename.as_str(),
            asset.canvas_id.as_str(),
            asset.canvas_name.as_str(),
            asset.widget_id.as_str(),
            asset.widget_name.as_str(),
            status.as_str(),
            backup_path.as_str(),
            backup_size.as_str(),
            backup_modified.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
