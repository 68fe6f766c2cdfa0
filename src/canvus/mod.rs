//! Canvus server collaborators: the API capability surface, request rate
//! limiting, and asset discovery.

pub mod discovery;
pub mod limiter;
pub mod session;
pub mod types;

pub use discovery::{
    discover_all_assets, discover_with_cap, validate_assets_on_server, AssetInfo,
    DiscoveryResult, ServerValidationResult,
};
pub use limiter::RateLimiter;
pub use session::{CanvusApi, CanvusSession};
pub use types::{
    BackgroundImage, Canvas, CanvasBackground, ImageDetails, PdfDetails, VideoDetails, Widget,
    WidgetType,
};
