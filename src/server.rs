//! HTTP surface — webhook and health endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::dispatch::{Dispatcher, WebhookBody};
use crate::line::{LineClient, signature};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub line: Arc<LineClient>,
    pub channel_secret: SecretString,
}

/// Build the Axum router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ── Webhook ─────────────────────────────────────────────────────────

/// Webhook handler. Always acknowledges a validly-signed delivery with 200
/// — per-event failures are swallowed into fallback reply messages, never
/// surfaced as HTTP errors.
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let header = headers
        .get("x-line-signature")
        .and_then(|v| v.to_str().ok());

    if !signature::verify(state.channel_secret.expose_secret(), header, &body) {
        warn!("rejecting webhook with missing or invalid signature");
        return (StatusCode::BAD_REQUEST, "Bad signature").into_response();
    }

    let batch: WebhookBody = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(error = %e, "failed to decode webhook body, treating as empty batch");
            WebhookBody::default()
        }
    };

    info!(events = batch.events.len(), "webhook received and validated");
    let intents = state.dispatcher.dispatch(batch.events).await;

    // Deliver all replies concurrently; each failure is logged on its own
    // so one bad send cannot mask the others. The 200 below is owed to the
    // platform regardless.
    let sends = intents.into_iter().map(|intent| {
        let line = Arc::clone(&state.line);
        async move {
            if let Err(e) = line.reply(&intent.reply_token, &intent.messages).await {
                error!(reply_token = %intent.reply_token, error = %e, "reply delivery failed");
            }
        }
    });
    futures::future::join_all(sends).await;

    Json(serde_json::json!({"status": "ok"})).into_response()
}
