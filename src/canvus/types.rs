//! Wire types for the Canvus HTTP API.
//!
//! Only the fields the recovery pipeline consumes are modeled; the server
//! returns more, and serde ignores the rest. Each media kind gets its own
//! statically-typed detail record carrying the same three fields the crawl
//! extracts: `hash`, `original_filename`, and `title`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A canvas as returned by `GET canvases`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A widget as returned by `GET canvases/{id}/widgets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub widget_type: WidgetType,
}

/// Widget type tag.
///
/// Only the media kinds carry assets. `CanvasBackground` never appears on the
/// wire; it tags the synthetic asset record built from a canvas's background
/// image. Everything else the server may send (notes, browsers, anchors, ...)
/// folds into `Other` and is skipped during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetType {
    Image,
    Pdf,
    Video,
    CanvasBackground,
    #[serde(other)]
    Other,
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WidgetType::Image => "Image",
            WidgetType::Pdf => "Pdf",
            WidgetType::Video => "Video",
            WidgetType::CanvasBackground => "CanvasBackground",
            WidgetType::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Image widget details from `GET canvases/{id}/images/{widget_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetails {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_filename: String,
}

/// PDF widget details from `GET canvases/{id}/pdfs/{widget_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDetails {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_filename: String,
}

/// Video widget details from `GET canvases/{id}/videos/{widget_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_filename: String,
}

/// Canvas background settings from `GET canvases/{id}/background`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasBackground {
    #[serde(default)]
    pub image: Option<BackgroundImage>,
}

/// Background image reference; present only when the canvas has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundImage {
    #[serde(default)]
    pub hash: String,
}
