//! REST collaborator client
//!
//! Implements the collaborator traits over the backend's REST surface:
//! ledger-adjustment batches, WhatsApp operator notifications, drawer
//! snapshots for resynchronization, photo evidence, reporting reads, and
//! the public service-tracking page.
//!
//! # Auth expiry
//!
//! Any authenticated call answered 401 means the session expired and the
//! caller must tear down all authentication state. Endpoints on
//! [`AUTH_EXEMPT_PATHS`] are the exception: they may legitimately answer
//! 401 without implying expiry (the public tracking read).

use crate::core::traits::{LedgerGateway, NotificationTransport, SnapshotSource};
use crate::net::config::Endpoints;
use crate::types::{DrawerId, DrawerSnapshot, LedgerAdjustment, RegisterError};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::RwLock;
use tracing::warn;

/// Endpoint prefixes that may answer 401 without implying session expiry
pub const AUTH_EXEMPT_PATHS: &[&str] = &["servicios/publico"];

/// Current state of a repair ticket, as shown on the public tracking page
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStatus {
    /// Ticket identifier
    pub ticket: String,

    /// Human-readable current state
    pub status: String,

    /// When the state last changed, if the backend reports it
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// REST client over the backend collaborators
pub struct RestClient {
    http: Client,
    endpoints: Endpoints,
    token: RwLock<Option<String>>,
}

impl RestClient {
    /// Create a client for the given endpoints, unauthenticated
    pub fn new(endpoints: Endpoints) -> Self {
        RestClient {
            http: Client::new(),
            endpoints,
            token: RwLock::new(None),
        }
    }

    /// Install or clear the bearer token used for authenticated calls
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> Result<Url, RegisterError> {
        self.endpoints.rest(path)
    }

    /// Map a response status to the error taxonomy
    fn check_status(path: &str, status: StatusCode) -> Result<(), RegisterError> {
        if status == StatusCode::UNAUTHORIZED && !is_auth_exempt(path) {
            return Err(RegisterError::auth_expired(path));
        }
        if !status.is_success() {
            return Err(RegisterError::http(path, status.as_u16()));
        }
        Ok(())
    }

    /// Attach photo evidence to a drawer lifecycle step
    ///
    /// Fire-and-forget: failures are logged and never propagated, so a
    /// missing photo can never block opening, reconciling, or closing a
    /// drawer.
    ///
    /// # Arguments
    ///
    /// * `drawer` - The drawer the evidence belongs to
    /// * `stage` - Lifecycle step ("open", "reconcile", "close")
    /// * `image_base64` - The photo, base64-encoded
    pub async fn attach_photo_evidence(&self, drawer: DrawerId, stage: &str, image_base64: &str) {
        let path = "cajas/evidencia-fotografica";
        let url = match self.url(path) {
            Ok(url) => url,
            Err(error) => {
                warn!(%error, "photo evidence endpoint unavailable");
                return;
            }
        };

        let body = json!({
            "drawer": drawer,
            "stage": stage,
            "image": image_base64,
        });

        match self.authorized(self.http.post(url)).json(&body).send().await {
            Ok(response) => {
                if let Err(error) = Self::check_status(path, response.status()) {
                    warn!(drawer, stage, %error, "photo evidence upload failed");
                }
            }
            Err(error) => warn!(drawer, stage, %error, "photo evidence upload failed"),
        }
    }

    /// Fetch a report by path suffix
    ///
    /// Reporting reads are presentation passthrough: the payload shape is
    /// owned by the backend and rendered directly, so it stays untyped
    /// here and never enters business logic.
    pub async fn fetch_report(&self, report: &str) -> Result<serde_json::Value, RegisterError> {
        let path = format!("reportes/{report}");
        let url = self.url(&path)?;

        let response = self.authorized(self.http.get(url)).send().await?;
        Self::check_status(&path, response.status())?;
        Ok(response.json().await?)
    }

    /// Read a repair ticket's public tracking state
    ///
    /// Unauthenticated by design; a 401 here never implies session
    /// expiry.
    pub async fn public_service_status(&self, token: &str) -> Result<ServiceStatus, RegisterError> {
        let path = format!("servicios/publico/{token}");
        let url = self.url(&path)?;

        let response = self.http.get(url).send().await?;
        Self::check_status(&path, response.status())?;
        Ok(response.json().await?)
    }
}

impl LedgerGateway for RestClient {
    /// Post the adjustment batch in one request
    ///
    /// The backend applies the batch transactionally; a non-success
    /// answer means none of it was applied.
    async fn post_adjustments(&self, batch: &[LedgerAdjustment]) -> Result<(), RegisterError> {
        let path = "cajas/ajustes";
        let url = self.url(path)?;

        let response = self
            .authorized(self.http.post(url))
            .json(&json!({ "adjustments": batch }))
            .send()
            .await?;
        Self::check_status(path, response.status())
    }
}

impl NotificationTransport for RestClient {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), RegisterError> {
        let path = "whatsapp/enviar";
        let url = self.url(path)?;

        let response = self
            .authorized(self.http.post(url))
            .json(&json!({ "to": recipient, "message": message }))
            .send()
            .await?;
        Self::check_status(path, response.status())
    }
}

impl SnapshotSource for RestClient {
    async fn fetch_drawer_snapshot(&self) -> Result<DrawerSnapshot, RegisterError> {
        let path = "cajas/actual";
        let url = self.url(path)?;

        let response = self.authorized(self.http.get(url)).send().await?;
        Self::check_status(path, response.status())?;
        Ok(response.json().await?)
    }
}

fn is_auth_exempt(path: &str) -> bool {
    AUTH_EXEMPT_PATHS
        .iter()
        .any(|prefix| path.starts_with(prefix))
}
