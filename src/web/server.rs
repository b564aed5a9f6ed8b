//! Webhook server receiving Seerr notifications.
//!
//! The endpoint acknowledges as soon as the payload is authenticated and
//! parsed; rendering and Discord delivery run in a spawned task so the
//! upstream notifier gets its bounded-latency response.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::BotError;
use crate::notify::{render, Dispatcher};
use crate::web::receive::receive;

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    pub auth_header: Option<String>,
    pub seerr_url: String,
    pub dispatcher: Arc<Dispatcher>,
}

/// Webhook server configuration
pub struct WebhookServerConfig {
    pub host: String,
    pub port: u16,
}

/// Start the webhook server. Runs until the listener fails.
pub async fn start_webhook_server(
    config: WebhookServerConfig,
    state: WebhookState,
) -> anyhow::Result<()> {
    if state.auth_header.is_none() {
        warn!("WEBHOOK_AUTH_HEADER not set - webhook endpoint accepts unauthenticated requests");
    }

    let app = Router::new()
        .route("/webhook", post(webhook_endpoint))
        .route("/health", get(health))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid webhook bind address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Webhook server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Liveness probe. No auth, constant response.
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

/// POST /webhook - authenticate, normalize, acknowledge, then deliver.
async fn webhook_endpoint(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let event = match receive(state.auth_header.as_deref(), auth_header, &body) {
        Ok(event) => event,
        Err(BotError::WebhookAuth) => {
            warn!("Rejected webhook with missing or invalid authorization");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid authorization"})),
            );
        }
        Err(BotError::WebhookParse { message }) => {
            warn!("Rejected malformed webhook payload: {}", message);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid JSON data"})),
            );
        }
        Err(e) => {
            error!("Error processing webhook: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            );
        }
    };

    info!("Received webhook event: {:?}", event.kind);

    let rendered = render(&event, Some(&state.seerr_url));
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        let outcome = dispatcher.dispatch(&event, &rendered).await;
        info!(
            "Dispatched {:?}: dm_sent={} channel_fallback={} recipient={:?}",
            event.kind, outcome.dm_sent, outcome.channel_fallback_used, outcome.recipient
        );
    });

    (StatusCode::OK, Json(json!({"status": "success"})))
}
