//! Test fixtures shared by the integration tests
#![allow(dead_code)]

use async_tungstenite::tungstenite::{Error as WsError, Message};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
    Form, Json, Router,
};
use futures::{Stream, StreamExt};
use pair_room::config::AppConfig;
use pair_room::fleet::FleetClaimer;
use pair_room::service::AppState;
use pair_room::types::{ClaimRequest, ServerAllocation};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// How long a test waits for anything before giving up
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Service configuration bound to an ephemeral local port with fast polling
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.service.host = "127.0.0.1".to_string();
    config.service.port = 0;
    config.service.shutdown_timeout_seconds = 2;
    config.matchmaking.idle_interval_ms = 20;
    config.matchmaking.flush_delay_ms = 10;
    config
}

/// Start a full service with the given claimer
pub async fn start_service(claimer: Arc<dyn FleetClaimer>) -> (AppState, SocketAddr) {
    let mut app = AppState::new(test_config(), claimer).expect("Failed to build service");
    let addr = app.start().await.expect("Failed to start service");
    (app, addr)
}

pub fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{}/", addr)
}

/// What a client saw next on its socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Text(String),
    Closed,
}

/// Read the next text frame or close from a client socket, ignoring pings
pub async fn next_event<S>(ws: &mut S) -> Option<ClientEvent>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(message)) if message.is_text() => {
                    let text = message.to_text().expect("text frame").to_string();
                    return ClientEvent::Text(text);
                }
                Some(Ok(message)) if message.is_close() => return ClientEvent::Closed,
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return ClientEvent::Closed,
            }
        }
    })
    .await
    .ok()
}

/// Poll `condition` until it holds or the test timeout passes
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub const CLIENT_ID: &str = "pair-room";
pub const CLIENT_SECRET: &str = "s3cret";
/// `Basic` credentials for CLIENT_ID:CLIENT_SECRET
pub const BASIC_CREDENTIALS: &str = "Basic cGFpci1yb29tOnMzY3JldA==";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// In-process stand-in for the fleet allocator's HTTP API
#[derive(Clone, Default)]
pub struct MockAllocator {
    claim_status: Arc<Mutex<Option<StatusCode>>>,
    claims: Arc<Mutex<Vec<(String, ClaimRequest)>>>,
    /// Token accepted by the claim endpoint, if any
    valid_token: Arc<Mutex<Option<String>>>,
    logins: Arc<Mutex<usize>>,
}

impl MockAllocator {
    /// Make every following claim fail with `status`
    pub fn fail_claims_with(&self, status: StatusCode) {
        *self.claim_status.lock().unwrap() = Some(status);
    }

    /// Reject the token handed out so far, as if it had expired
    pub fn expire_token(&self) {
        *self.valid_token.lock().unwrap() = None;
    }

    /// Number of successful logins
    pub fn login_count(&self) -> usize {
        *self.logins.lock().unwrap()
    }

    /// Every claim received, with the namespace it was sent to
    pub fn claims(&self) -> Vec<(String, ClaimRequest)> {
        self.claims.lock().unwrap().clone()
    }

    /// Serve the mock on an ephemeral port and return its base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/iam/v3/oauth/token", post(token_handler))
            .route(
                "/ams/v1/namespaces/{namespace}/servers/claim",
                put(claim_handler),
            )
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn token_handler(
    State(allocator): State<MockAllocator>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == BASIC_CREDENTIALS)
        .unwrap_or(false);

    if !authorized || form.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return (StatusCode::UNAUTHORIZED, "invalid client").into_response();
    }

    let login = {
        let mut logins = allocator.logins.lock().unwrap();
        *logins += 1;
        *logins
    };
    let token = format!("{}-{}", ACCESS_TOKEN, login);
    *allocator.valid_token.lock().unwrap() = Some(token.clone());

    Json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn claim_handler(
    State(allocator): State<MockAllocator>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ClaimRequest>,
) -> Response {
    let expected = allocator
        .valid_token
        .lock()
        .unwrap()
        .as_ref()
        .map(|token| format!("Bearer {}", token));
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if expected.is_none() || presented != expected {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }

    allocator
        .claims
        .lock()
        .unwrap()
        .push((namespace, request.clone()));

    if let Some(status) = *allocator.claim_status.lock().unwrap() {
        return (status, "claim failed").into_response();
    }

    let mut allocation = ServerAllocation::new("10.0.0.1", "default", 7777);
    allocation.region = request.regions.first().cloned();
    allocation.server_id = Some("server-1".to_string());
    Json(allocation).into_response()
}
