//! DVSPortal HTTP client implementation

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{Local, NaiveDateTime};
use dvs_core::{PortalSnapshot, VENDOR_TIMESTAMP_FORMAT};
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{PortalError, Result};
use crate::snapshot;
use crate::types::{
    CreateReservationRequest, EndReservationRequest, LoginRequest, LoginResponse, PlateBody,
    StoreLicensePlateRequest,
};

/// Fixed base path of the vendor API on every portal host
const API_BASE_PATH: &str = "/DVSWebAPI/api/";

/// Permit-media type the portal expects for password logins and plate upserts
const PERMIT_MEDIA_TYPE_ID: i64 = 1;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_USER_AGENT: &str = concat!("dvs-client/", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`DvsPortal`] client
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Overrides the default `dvs-client/<version>` User-Agent
    pub user_agent: Option<String>,
    /// Externally supplied HTTP client. The supplier keeps ownership of its
    /// pool and is responsible for its timeouts; the timeout fields above
    /// are ignored in that case.
    pub http_client: Option<Client>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: None,
            http_client: None,
        }
    }
}

/// Async client for the DVSPortal guest-parking API.
///
/// Owns a cached bearer token and the last successfully fetched
/// [`PortalSnapshot`]. Both caches live behind async locks so a poll loop
/// and action calls can share one instance; no ordering is guaranteed
/// between an in-flight [`update`](Self::update) and a concurrent action.
/// Resources are released on drop.
pub struct DvsPortal {
    http: Client,
    base_url: Url,
    identifier: String,
    password: String,
    user_agent: String,
    token: RwLock<Option<String>>,
    snapshot: RwLock<Option<PortalSnapshot>>,
}

impl DvsPortal {
    /// Create a client for `https://<api_host>:443/DVSWebAPI/api/` with
    /// default configuration.
    pub fn new(api_host: &str, identifier: &str, password: &str) -> Result<Self> {
        Self::with_config(api_host, identifier, password, PortalConfig::default())
    }

    /// Create a client for a portal host with custom configuration.
    pub fn with_config(
        api_host: &str,
        identifier: &str,
        password: &str,
        config: PortalConfig,
    ) -> Result<Self> {
        let base = format!("https://{}:443{}", api_host, API_BASE_PATH);
        Self::with_base_url(&base, identifier, password, config)
    }

    /// Create a client against an explicit API base URL.
    ///
    /// Used by tests and by deployments that do not sit on the standard
    /// host/port layout. The base is treated as a directory: relative
    /// endpoint paths are joined underneath it.
    pub fn with_base_url(
        base_url: &str,
        identifier: &str,
        password: &str,
        config: PortalConfig,
    ) -> Result<Self> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        let http = match config.http_client {
            Some(client) => client,
            None => Client::builder()
                .timeout(config.request_timeout)
                .connect_timeout(config.connect_timeout)
                .build()?,
        };

        Ok(Self {
            http,
            base_url,
            identifier: identifier.to_string(),
            password: password.to_string(),
            user_agent: config
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            token: RwLock::new(None),
            snapshot: RwLock::new(None),
        })
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Return the cached bearer token, logging in first if necessary.
    ///
    /// Idempotent once populated; the token lives for the client's lifetime
    /// unless an authorized request is rejected, which clears it for one
    /// re-login attempt.
    #[instrument(skip(self))]
    pub async fn token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        debug!("no cached token, logging in");
        let body = LoginRequest::password_login(&self.identifier, &self.password);
        let raw = self.request("login", &body, None).await?;
        let login: LoginResponse =
            serde_json::from_value(raw).map_err(|e| PortalError::Parse(e.to_string()))?;

        *self.token.write().await = Some(login.token.clone());
        Ok(login.token)
    }

    /// Value of the `Authorization` header: `Token <base64(token)>`.
    pub async fn authorization_header(&self) -> Result<String> {
        let token = self.token().await?;
        Ok(format!("Token {}", BASE64.encode(token)))
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Issue an authorized request, re-authenticating exactly once when the
    /// portal rejects the cached token.
    async fn authorized_request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value> {
        let auth = self.authorization_header().await?;
        match self.request(path, body, Some(&auth)).await {
            Err(PortalError::Auth(reason)) => {
                debug!(%reason, "cached token rejected, re-authenticating");
                self.invalidate_token().await;
                let auth = self.authorization_header().await?;
                self.request(path, body, Some(&auth)).await
            }
            result => result,
        }
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// POST a JSON body to an endpoint and classify the outcome.
    ///
    /// Timeouts and transport failures map to their own variants; non-JSON
    /// bodies and error statuses map to [`PortalError::Server`]; 401/403 and
    /// vendor-flagged credential errors map to [`PortalError::Auth`]. The
    /// vendor reports some errors through an `ErrorMessage` field on an
    /// otherwise successful response, so that field is checked even on 2xx.
    async fn request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&str>,
    ) -> Result<serde_json::Value> {
        let url = self.base_url.join(path)?;

        let mut request = self
            .http
            .post(url)
            .json(body)
            .header(header::USER_AGENT, self.user_agent.as_str());
        if let Some(value) = auth {
            request = request.header(header::AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PortalError::Timeout
            } else {
                PortalError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with("application/json") {
            let text = response
                .text()
                .await
                .map_err(|e| PortalError::Connection(e.to_string()))?;
            return Err(PortalError::server_error(status.as_u16(), text));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortalError::Parse(e.to_string()))?;

        let vendor_error = payload
            .get("ErrorMessage")
            .and_then(|v| v.as_str())
            .map(String::from);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PortalError::Auth(
                vendor_error.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(PortalError::server_error(
                status.as_u16(),
                vendor_error.unwrap_or_else(|| payload.to_string()),
            ));
        }
        if let Some(message) = vendor_error {
            if is_auth_message(&message) {
                return Err(PortalError::Auth(message));
            }
            return Err(PortalError::server_error(status.as_u16(), message));
        }

        Ok(payload)
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Fetch the base payload and rebuild the cached snapshot.
    ///
    /// The fresh snapshot is committed in a single assignment after
    /// normalization succeeds; any failure leaves the previous snapshot
    /// untouched.
    #[instrument(skip(self))]
    pub async fn update(&self) -> Result<PortalSnapshot> {
        let raw = self
            .authorized_request("login/getbase", &serde_json::json!({}))
            .await?;
        let base = serde_json::from_value(raw).map_err(|e| PortalError::Parse(e.to_string()))?;
        let fresh = snapshot::from_base(&base)?;

        *self.snapshot.write().await = Some(fresh.clone());
        debug!(
            reservations = fresh.active_reservations.len(),
            plates = fresh.known_license_plates.len(),
            "portal snapshot refreshed"
        );
        Ok(fresh)
    }

    /// Last successfully fetched snapshot, if any.
    pub async fn snapshot(&self) -> Option<PortalSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn defaults(&self) -> (Option<i64>, Option<String>) {
        let snapshot = self.snapshot.read().await;
        match snapshot.as_ref() {
            Some(s) => (s.default_type_id, s.default_code.clone()),
            None => (None, None),
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Create a reservation for a plate.
    ///
    /// Permit type and code default to the cached permit defaults and
    /// `date_from` defaults to now; `DateUntil` is sent only when an end
    /// time is supplied. The cached snapshot is not refreshed here - the
    /// caller requests a refresh afterwards.
    #[instrument(skip(self))]
    pub async fn create_reservation(
        &self,
        license_plate: &str,
        license_plate_name: Option<&str>,
        type_id: Option<i64>,
        code: Option<&str>,
        date_from: Option<NaiveDateTime>,
        date_until: Option<NaiveDateTime>,
    ) -> Result<serde_json::Value> {
        let (default_type_id, default_code) = self.defaults().await;
        let date_from = date_from.unwrap_or_else(|| Local::now().naive_local());

        let body = CreateReservationRequest {
            date_from: date_from.format(VENDOR_TIMESTAMP_FORMAT).to_string(),
            license_plate: PlateBody {
                value: license_plate.to_string(),
                name: license_plate_name.map(String::from),
            },
            permit_media_type_id: type_id.or(default_type_id),
            permit_media_code: code.map(String::from).or(default_code),
            date_until: date_until.map(|d| d.format(VENDOR_TIMESTAMP_FORMAT).to_string()),
        };
        self.authorized_request("reservation/create", &body).await
    }

    /// End an active reservation.
    #[instrument(skip(self))]
    pub async fn end_reservation(
        &self,
        reservation_id: i64,
        type_id: Option<i64>,
        code: Option<&str>,
    ) -> Result<serde_json::Value> {
        let (default_type_id, default_code) = self.defaults().await;

        let body = EndReservationRequest {
            reservation_id,
            permit_media_type_id: type_id.or(default_type_id),
            permit_media_code: code.map(String::from).or(default_code),
        };
        self.authorized_request("reservation/end", &body).await
    }

    /// Store or rename a license plate on the permit medium.
    #[instrument(skip(self))]
    pub async fn store_license_plate(
        &self,
        license_plate: &str,
        name: &str,
        permit_media_code: Option<&str>,
    ) -> Result<serde_json::Value> {
        let (_, default_code) = self.defaults().await;

        let body = StoreLicensePlateRequest {
            permit_media_type_id: PERMIT_MEDIA_TYPE_ID,
            permit_media_code: permit_media_code.map(String::from).or(default_code),
            license_plate: PlateBody {
                value: license_plate.to_string(),
                name: Some(name.to_string()),
            },
            update_license_plate: None,
        };
        self.authorized_request("permitmedialicenseplate/upsert", &body)
            .await
    }
}

/// Whether a vendor `ErrorMessage` on a 2xx response describes an auth
/// problem rather than a generic failure.
fn is_auth_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["token", "credential", "password", "login"]
        .iter()
        .any(|needle| message.contains(needle))
}
