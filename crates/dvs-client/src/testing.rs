//! Test utilities for dvs-client
//!
//! Provides a mock DVSPortal vendor server and a [`TestServer`] harness that
//! binds it to an ephemeral port with a connected client. Integration tests
//! across the workspace drive the real client against this mock.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{DvsPortal, PortalConfig, Result};

/// Identifier the mock portal accepts
pub const MOCK_IDENTIFIER: &str = "12345";
/// Password the mock portal accepts
pub const MOCK_PASSWORD: &str = "hunter2";

/// A captured action request, for request-body assertions
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

/// Failure to inject into the next authorized request
#[derive(Debug, Clone)]
pub enum Failure {
    /// Respond with a plain-text body instead of JSON
    PlainText(String),
    /// Respond 200 with a vendor `ErrorMessage` field
    VendorError(String),
    /// Respond with the given HTTP status and `ErrorMessage`
    Status(u16, String),
    /// Sleep before answering, to trip client timeouts
    Delay(Duration),
}

struct MockState {
    base_payload: RwLock<Value>,
    tokens: RwLock<HashSet<String>>,
    token_seq: AtomicU64,
    login_count: AtomicU64,
    requests: RwLock<Vec<RecordedRequest>>,
    fail_next: Mutex<Option<Failure>>,
}

/// In-memory stand-in for a DVSPortal vendor host.
///
/// Issues tokens on login, validates the `Token <base64>` authorization
/// scheme, serves a configurable base payload and records action bodies.
#[derive(Clone)]
pub struct MockPortal {
    state: Arc<MockState>,
}

impl Default for MockPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                base_payload: RwLock::new(default_base_payload()),
                tokens: RwLock::new(HashSet::new()),
                token_seq: AtomicU64::new(0),
                login_count: AtomicU64::new(0),
                requests: RwLock::new(Vec::new()),
                fail_next: Mutex::new(None),
            }),
        }
    }

    /// Replace the payload served by `login/getbase`
    pub fn set_base_payload(&self, payload: Value) {
        *self.state.base_payload.write().unwrap() = payload;
    }

    /// Invalidate every issued token, as an expired session would
    pub fn revoke_tokens(&self) {
        self.state.tokens.write().unwrap().clear();
    }

    /// Inject a failure into the next authorized request
    pub fn fail_next(&self, failure: Failure) {
        *self.state.fail_next.lock().unwrap() = Some(failure);
    }

    /// How many logins the mock has served
    pub fn login_count(&self) -> u64 {
        self.state.login_count.load(Ordering::SeqCst)
    }

    /// Captured action requests, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().unwrap().clone()
    }

    /// The most recent captured action request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.read().unwrap().last().cloned()
    }

    /// Build the axum router serving the vendor API surface
    pub fn router(&self) -> Router {
        Router::new()
            .route("/DVSWebAPI/api/login", post(login))
            .route("/DVSWebAPI/api/login/getbase", post(getbase))
            .route("/DVSWebAPI/api/reservation/create", post(action))
            .route("/DVSWebAPI/api/reservation/end", post(action))
            .route(
                "/DVSWebAPI/api/permitmedialicenseplate/upsert",
                post(action),
            )
            .with_state(self.state.clone())
    }
}

/// A realistic single-permit account: balance, one active and one scheduled
/// reservation, one named plate and a short history with a redacted entry.
pub fn default_base_payload() -> Value {
    json!({
        "Permits": [{
            "UnitPrice": 0.1,
            "PermitMedias": [{
                "TypeID": 1,
                "Code": "ZC12",
                "Balance": 380.0,
                "RemainingUpgrades": 2,
                "RemainingDowngrades": 0,
                "ActiveReservations": [
                    {
                        "ReservationID": 10,
                        "ValidFrom": "2024-05-01T11:00:00",
                        "ValidUntil": "2024-05-01T13:00:00",
                        "Units": 120,
                        "LicensePlate": {"Value": "AB-123-C"}
                    },
                    {
                        "ReservationID": 11,
                        "ValidFrom": "2024-05-01T18:00:00",
                        "ValidUntil": "2024-05-01T20:00:00",
                        "LicensePlate": {"Value": "XY-999-Z"}
                    }
                ],
                "LicensePlates": [
                    {"Value": "AB-123-C", "Name": "Jan"}
                ],
                "History": {
                    "Reservations": {
                        "Items": [
                            {
                                "ReservationID": 8,
                                "ValidFrom": "2024-04-28T09:00:00",
                                "ValidUntil": "2024-04-28T11:00:00",
                                "Units": 120,
                                "LicensePlate": {"DisplayValue": "KL-456-M"}
                            },
                            {
                                "ReservationID": 4,
                                "ValidFrom": "2024-04-19T09:00:00",
                                "ValidUntil": "2024-04-19T10:00:00",
                                "Units": 60,
                                "LicensePlate": {"DisplayValue": "********"}
                            }
                        ]
                    }
                }
            }]
        }]
    })
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_count.fetch_add(1, Ordering::SeqCst);

    let identifier = body["identifier"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if identifier != MOCK_IDENTIFIER || password != MOCK_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ErrorMessage": "Invalid credentials"})),
        )
            .into_response();
    }

    let token = format!("tok-{}", state.token_seq.fetch_add(1, Ordering::SeqCst));
    state.tokens.write().unwrap().insert(token.clone());
    Json(json!({"Token": token})).into_response()
}

async fn getbase(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = reject_unauthorized(&state, &headers) {
        return rejection;
    }
    if let Some(failure) = take_failure(&state) {
        return fail(failure).await;
    }
    Json(state.base_payload.read().unwrap().clone()).into_response()
}

async fn action(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    uri: axum::http::Uri,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = reject_unauthorized(&state, &headers) {
        return rejection;
    }
    if let Some(failure) = take_failure(&state) {
        return fail(failure).await;
    }

    state.requests.write().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        body,
    });
    Json(json!({"Result": "OK"})).into_response()
}

fn reject_unauthorized(state: &MockState, headers: &HeaderMap) -> Option<Response> {
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .and_then(|encoded| BASE64.decode(encoded).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .map(|token| state.tokens.read().unwrap().contains(&token))
        .unwrap_or(false);

    if authorized {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"ErrorMessage": "Invalid token"})),
            )
                .into_response(),
        )
    }
}

fn take_failure(state: &MockState) -> Option<Failure> {
    state.fail_next.lock().unwrap().take()
}

async fn fail(failure: Failure) -> Response {
    match failure {
        Failure::PlainText(text) => (StatusCode::OK, text).into_response(),
        Failure::VendorError(message) => {
            Json(json!({"ErrorMessage": message})).into_response()
        }
        Failure::Status(status, message) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"ErrorMessage": message})),
        )
            .into_response(),
        Failure::Delay(duration) => {
            tokio::time::sleep(duration).await;
            Json(json!({"Result": "OK"})).into_response()
        }
    }
}

/// A mock portal bound to an ephemeral port, with a connected client.
/// Shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: DvsPortal,
    pub portal: MockPortal,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Start a mock portal with the default payload and a client using
    /// short test timeouts.
    pub async fn start() -> Result<Self> {
        Self::start_with(MockPortal::new(), test_config()).await
    }

    /// Start with a prepared mock portal and client configuration.
    pub async fn start_with(portal: MockPortal, config: PortalConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = portal.router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}/DVSWebAPI/api/", addr);
        let client =
            DvsPortal::with_base_url(&base_url, MOCK_IDENTIFIER, MOCK_PASSWORD, config)?;

        Ok(Self {
            addr,
            client,
            portal,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the mock portal API
    pub fn base_url(&self) -> String {
        format!("http://{}/DVSWebAPI/api/", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Client configuration with timeouts suitable for tests
pub fn test_config() -> PortalConfig {
    PortalConfig {
        request_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(500),
        ..PortalConfig::default()
    }
}
