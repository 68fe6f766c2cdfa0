//! Canvus API session.
//!
//! [`CanvusApi`] is the narrow capability surface the recovery pipeline
//! consumes; [`CanvusSession`] is the production implementation over HTTP.
//! Transport concerns (timeouts, TLS, token handling) live here and nowhere
//! else; the pipeline never retries, so any retry policy belongs in this
//! layer if one is ever added.

use crate::canvus::types::{
    Canvas, CanvasBackground, ImageDetails, PdfDetails, VideoDetails, Widget,
};
use crate::error::RecoveryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Remote canvas/asset service capability set.
#[async_trait]
pub trait CanvusApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<(), RecoveryError>;
    async fn logout(&self) -> Result<(), RecoveryError>;
    async fn list_canvases(&self) -> Result<Vec<Canvas>, RecoveryError>;
    async fn list_widgets(&self, canvas_id: &str) -> Result<Vec<Widget>, RecoveryError>;
    async fn get_image_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<ImageDetails, RecoveryError>;
    async fn get_pdf_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<PdfDetails, RecoveryError>;
    async fn get_video_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<VideoDetails, RecoveryError>;
    async fn get_canvas_background(
        &self,
        canvas_id: &str,
    ) -> Result<CanvasBackground, RecoveryError>;

    /// Fetch raw asset bytes by hash. Used only for server-side existence
    /// validation, never for recovery itself.
    async fn get_asset_by_hash(
        &self,
        canvas_id: &str,
        hash: &str,
    ) -> Result<Vec<u8>, RecoveryError>;
}

/// Authenticated HTTP session against a Canvus server.
pub struct CanvusSession {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl CanvusSession {
    /// Build a session for `server_url`. Self-hosted deployments commonly run
    /// with self-signed certificates, hence the `insecure_tls` escape hatch.
    pub fn new(
        server_url: &str,
        timeout_secs: u64,
        insecure_tls: bool,
    ) -> Result<Self, RecoveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(insecure_tls)
            .build()
            .map_err(|e| RecoveryError::Api(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_api_url(server_url),
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().clone() {
            Some(token) => req.header("Private-Token", token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RecoveryError> {
        debug!(path, "GET");
        let resp = self.authorize(self.client.get(self.endpoint(path))).send().await?;
        if !resp.status().is_success() {
            return Err(RecoveryError::Api(format!(
                "GET {} returned {}",
                path,
                resp.status()
            )));
        }
        Ok(resp.json::<T>().await?)
    }
}

/// Normalize a server URL to its API root (`…/api/v1`, no trailing slash).
fn normalize_api_url(server_url: &str) -> String {
    let trimmed = server_url.trim_end_matches('/');
    if trimmed.ends_with("/api/v1") {
        trimmed.to_string()
    } else {
        format!("{}/api/v1", trimmed)
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: String,
}

#[async_trait]
impl CanvusApi for CanvusSession {
    async fn login(&self, username: &str, password: &str) -> Result<(), RecoveryError> {
        let resp = self
            .client
            .post(self.endpoint("users/login"))
            .json(&json!({ "email": username, "password": password }))
            .send()
            .await
            .map_err(|e| RecoveryError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RecoveryError::Auth(format!(
                "server returned {}",
                resp.status()
            )));
        }

        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| RecoveryError::Auth(format!("malformed login response: {}", e)))?;
        if body.token.is_empty() {
            return Err(RecoveryError::Auth("login response carried no token".to_string()));
        }

        *self.token.write() = Some(body.token);
        Ok(())
    }

    async fn logout(&self) -> Result<(), RecoveryError> {
        let resp = self
            .authorize(self.client.post(self.endpoint("users/logout")))
            .json(&json!({}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RecoveryError::Api(format!(
                "logout returned {}",
                resp.status()
            )));
        }
        *self.token.write() = None;
        Ok(())
    }

    async fn list_canvases(&self) -> Result<Vec<Canvas>, RecoveryError> {
        self.get_json("canvases").await
    }

    async fn list_widgets(&self, canvas_id: &str) -> Result<Vec<Widget>, RecoveryError> {
        self.get_json(&format!("canvases/{}/widgets", canvas_id)).await
    }

    async fn get_image_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<ImageDetails, RecoveryError> {
        self.get_json(&format!("canvases/{}/images/{}", canvas_id, widget_id))
            .await
    }

    async fn get_pdf_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<PdfDetails, RecoveryError> {
        self.get_json(&format!("canvases/{}/pdfs/{}", canvas_id, widget_id))
            .await
    }

    async fn get_video_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<VideoDetails, RecoveryError> {
        self.get_json(&format!("canvases/{}/videos/{}", canvas_id, widget_id))
            .await
    }

    async fn get_canvas_background(
        &self,
        canvas_id: &str,
    ) -> Result<CanvasBackground, RecoveryError> {
        self.get_json(&format!("canvases/{}/background", canvas_id)).await
    }

    async fn get_asset_by_hash(
        &self,
        canvas_id: &str,
        hash: &str,
    ) -> Result<Vec<u8>, RecoveryError> {
        let path = format!("assets/{}", hash);
        // The assets endpoint resolves the hash in the context of a canvas,
        // passed as a header rather than a path segment.
        let resp = self
            .authorize(self.client.get(self.endpoint(&path)))
            .header("canvas-id", canvas_id)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RecoveryError::Api(format!(
                "GET {} returned {}",
                path,
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
