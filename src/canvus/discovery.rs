//! Asset discovery across canvases.
//!
//! Crawls every canvas through the [`CanvusApi`] capability, extracting one
//! [`AssetInfo`] per media reference: Image/Pdf/Video widgets plus canvas
//! background images. Per-canvas crawls run concurrently under a fixed task
//! cap and a shared rate limiter. Failures on individual canvases or widgets
//! are soft errors, recorded and skipped; only a failure to list the
//! canvases themselves aborts the crawl.

use crate::canvus::limiter::RateLimiter;
use crate::canvus::session::CanvusApi;
use crate::canvus::types::{Canvas, Widget, WidgetType};
use crate::error::RecoveryError;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default bound on concurrently crawled canvases. Independent of the
/// request-rate ceiling, which throttles call rate rather than concurrency.
pub const DEFAULT_CANVAS_CONCURRENCY: usize = 10;

/// One discovered media reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfo {
    pub hash: String,
    pub widget_type: WidgetType,
    pub original_filename: String,
    pub canvas_id: String,
    pub canvas_name: String,
    pub widget_id: String,
    pub widget_name: String,
}

/// Snapshot of one discovery run.
///
/// `assets` keeps every occurrence (duplicates allowed) in unspecified
/// order; the derived views below provide the deduplicated and grouped
/// forms. `errors` holds the soft per-canvas/per-widget failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub assets: Vec<AssetInfo>,
    pub canvases: Vec<Canvas>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_validation: Option<ServerValidationResult>,
}

impl DiscoveryResult {
    /// Deduplicate by hash. The result order is unspecified; callers treat
    /// it as a set.
    pub fn unique_assets(&self) -> Vec<AssetInfo> {
        let mut by_hash: HashMap<&str, &AssetInfo> = HashMap::new();
        for asset in &self.assets {
            by_hash.entry(asset.hash.as_str()).or_insert(asset);
        }
        by_hash.into_values().cloned().collect()
    }

    /// Group every occurrence (duplicates included) by canvas name.
    pub fn assets_by_canvas(&self) -> HashMap<String, Vec<AssetInfo>> {
        let mut by_canvas: HashMap<String, Vec<AssetInfo>> = HashMap::new();
        for asset in &self.assets {
            by_canvas
                .entry(asset.canvas_name.clone())
                .or_default()
                .push(asset.clone());
        }
        by_canvas
    }
}

/// Outcome of the optional server-side existence probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerValidationResult {
    pub total_assets: usize,
    pub existing_assets: usize,
    pub missing_assets: usize,
    pub validation_errors: Vec<String>,
}

/// Discover all media assets across all canvases with the default
/// per-canvas concurrency cap.
pub async fn discover_all_assets(
    api: Arc<dyn CanvusApi>,
    requests_per_second: usize,
) -> Result<DiscoveryResult, RecoveryError> {
    discover_with_cap(api, requests_per_second, DEFAULT_CANVAS_CONCURRENCY).await
}

/// Discover all media assets with an explicit per-canvas concurrency cap.
pub async fn discover_with_cap(
    api: Arc<dyn CanvusApi>,
    requests_per_second: usize,
    max_concurrent_canvases: usize,
) -> Result<DiscoveryResult, RecoveryError> {
    let started_at = Utc::now();

    let canvases = api.list_canvases().await?;
    info!(canvases = canvases.len(), "starting asset discovery");

    let limiter = Arc::new(RateLimiter::new(requests_per_second));
    let gate = Arc::new(Semaphore::new(max_concurrent_canvases.max(1)));
    let assets: Arc<Mutex<Vec<AssetInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<_> = canvases
        .iter()
        .cloned()
        .map(|canvas| {
            let api = Arc::clone(&api);
            let limiter = Arc::clone(&limiter);
            let gate = Arc::clone(&gate);
            let assets = Arc::clone(&assets);
            let errors = Arc::clone(&errors);
            tokio::spawn(async move {
                let _slot = match gate.acquire().await {
                    Ok(slot) => slot,
                    Err(_) => return,
                };
                limiter.wait().await;

                let mut found = crawl_widgets(api.as_ref(), &canvas, &errors).await;
                found.extend(crawl_background(api.as_ref(), &canvas, &errors).await);

                // Lock only around the append; the network calls above run
                // unlocked.
                assets.lock().extend(found);
            })
        })
        .collect();

    join_all(tasks).await;

    let assets = std::mem::take(&mut *assets.lock());
    let errors = std::mem::take(&mut *errors.lock());
    let finished_at = Utc::now();

    info!(
        assets = assets.len(),
        soft_errors = errors.len(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "asset discovery complete"
    );

    Ok(DiscoveryResult {
        assets,
        canvases,
        started_at,
        finished_at,
        errors,
        server_validation: None,
    })
}

async fn crawl_widgets(
    api: &dyn CanvusApi,
    canvas: &Canvas,
    errors: &Mutex<Vec<String>>,
) -> Vec<AssetInfo> {
    let widgets = match api.list_widgets(&canvas.id).await {
        Ok(widgets) => widgets,
        Err(e) => {
            warn!(canvas = %canvas.name, error = %e, "failed to list widgets");
            errors.lock().push(format!(
                "canvas {} ({}): widget listing failed: {}",
                canvas.name, canvas.id, e
            ));
            return Vec::new();
        }
    };
    debug!(canvas = %canvas.name, widgets = widgets.len(), "listed widgets");

    let mut found = Vec::new();
    for widget in &widgets {
        match asset_from_widget(api, canvas, widget).await {
            Ok(Some(asset)) => {
                debug!(canvas = %canvas.name, hash = %asset.hash, kind = %asset.widget_type, "found media asset");
                found.push(asset);
            }
            Ok(None) => {}
            Err(e) => {
                errors.lock().push(format!(
                    "canvas {} widget {}: detail fetch failed: {}",
                    canvas.name, widget.id, e
                ));
            }
        }
    }
    found
}

/// Fetch the type-specific details for a media widget and build its asset
/// record. Non-media widgets and media widgets without a hash yield `None`.
async fn asset_from_widget(
    api: &dyn CanvusApi,
    canvas: &Canvas,
    widget: &Widget,
) -> Result<Option<AssetInfo>, RecoveryError> {
    let (hash, original_filename, title) = match widget.widget_type {
        WidgetType::Image => {
            let details = api.get_image_details(&canvas.id, &widget.id).await?;
            (details.hash, details.original_filename, details.title)
        }
        WidgetType::Pdf => {
            let details = api.get_pdf_details(&canvas.id, &widget.id).await?;
            (details.hash, details.original_filename, details.title)
        }
        WidgetType::Video => {
            let details = api.get_video_details(&canvas.id, &widget.id).await?;
            (details.hash, details.original_filename, details.title)
        }
        // Notes, browsers, connectors and the rest carry no asset.
        _ => return Ok(None),
    };

    // A media widget without a hash is not backed by an asset file.
    if hash.is_empty() {
        return Ok(None);
    }

    Ok(Some(AssetInfo {
        hash,
        widget_type: widget.widget_type.clone(),
        original_filename,
        canvas_id: canvas.id.clone(),
        canvas_name: canvas.name.clone(),
        widget_id: widget.id.clone(),
        widget_name: title,
    }))
}

async fn crawl_background(
    api: &dyn CanvusApi,
    canvas: &Canvas,
    errors: &Mutex<Vec<String>>,
) -> Vec<AssetInfo> {
    let background = match api.get_canvas_background(&canvas.id).await {
        Ok(background) => background,
        Err(e) => {
            errors.lock().push(format!(
                "canvas {} ({}): background fetch failed: {}",
                canvas.name, canvas.id, e
            ));
            return Vec::new();
        }
    };

    let Some(image) = background.image else {
        return Vec::new();
    };
    if image.hash.is_empty() {
        return Vec::new();
    }

    debug!(canvas = %canvas.name, hash = %image.hash, "found background asset");
    vec![AssetInfo {
        hash: image.hash,
        widget_type: WidgetType::CanvasBackground,
        // Background images carry no original filename.
        original_filename: String::new(),
        canvas_id: canvas.id.clone(),
        canvas_name: canvas.name.clone(),
        widget_id: "background".to_string(),
        widget_name: "Canvas Background".to_string(),
    }]
}

/// Probe the server for each unique discovered hash via the assets endpoint.
/// A probe failure counts the asset missing on the server; it never aborts.
pub async fn validate_assets_on_server(
    api: &dyn CanvusApi,
    assets: &[AssetInfo],
) -> ServerValidationResult {
    let mut unique: HashMap<&str, &AssetInfo> = HashMap::new();
    for asset in assets {
        if !asset.hash.is_empty() {
            unique.entry(asset.hash.as_str()).or_insert(asset);
        }
    }

    let mut result = ServerValidationResult {
        total_assets: unique.len(),
        existing_assets: 0,
        missing_assets: 0,
        validation_errors: Vec::new(),
    };

    for (hash, asset) in unique {
        match api.get_asset_by_hash(&asset.canvas_id, hash).await {
            Ok(_) => result.existing_assets += 1,
            Err(e) => {
                result.missing_assets += 1;
                result.validation_errors.push(format!(
                    "{} ({} on canvas {}): {}",
                    hash, asset.widget_type, asset.canvas_name, e
                ));
            }
        }
    }

    debug!(
        existing = result.existing_assets,
        missing = result.missing_assets,
        "server validation finished"
    );
    result
}
