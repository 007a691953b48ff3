//! HTTP relay between the browser widget and the upstream model API.
//!
//! The relay exposes three endpoints and a static file fallback:
//!
//! - `POST /api/chat` streams the assistant reply as chunked `text/plain`.
//! - `POST /api/suggest` returns follow-up suggestions as JSON.
//! - `GET /api/health` reports liveness.
//!
//! A chat response commits to status 200 before the first upstream byte
//! arrives, so upstream failures after that point surface in-band as a
//! visible notice appended to the text already streamed. The response body
//! always terminates; the forwarding task runs under the configured
//! upstream timeout and drops its channel sender when it finishes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::observability::{
    RELAY_REJECTED, RELAY_REQUESTS, RELAY_UNCONFIGURED, STREAM_FAILURES, STREAM_FRAGMENTS,
};
use crate::suggest;
use crate::types::{ChatRequest, CompletionParams, StreamEvent, SuggestRequest, SuggestResponse};
use crate::upstream::ModelBackend;

/// In-band notice appended to a chat response when the upstream stream
/// fails after the response status has already been sent.
pub const STREAM_FAILURE_NOTICE: &str =
    "\n\n[The assistant was interrupted. Please try again.]";

/// Rejection message for requests without a usable message.
const MISSING_MESSAGE: &str = "Missing 'message' in request body";

/// Shared state for every relay handler.
#[derive(Clone)]
pub struct RelayState {
    /// Upstream backend, absent when no credential was configured.
    pub backend: Option<Arc<dyn ModelBackend>>,
    /// Immutable configuration resolved at startup.
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    /// Creates relay state from a configuration and an optional backend.
    pub fn new(backend: Option<Arc<dyn ModelBackend>>, config: RelayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }
}

/// Builds the relay router with API routes, CORS, request tracing, and the
/// static widget bundle as fallback.
pub fn router(state: RelayState) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/suggest", post(suggest_handler))
        .route("/api/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

/// Streams an assistant reply for one visitor message.
///
/// The body is parsed leniently: a missing field, an empty message, or a
/// body that is not JSON at all are all the same visitor mistake and get
/// the same rejection, without touching the upstream.
async fn chat(State(state): State<RelayState>, body: Bytes) -> Response {
    RELAY_REQUESTS.click();
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = request.message.trim().to_string();
    if message.is_empty() {
        RELAY_REJECTED.click();
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": MISSING_MESSAGE})),
        )
            .into_response();
    }
    let Some(backend) = state.backend.clone() else {
        RELAY_UNCONFIGURED.click();
        tracing::error!("chat request received but no API credential is configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "The assistant is not configured on this server."})),
        )
            .into_response();
    };

    let params = CompletionParams::streaming(
        state.config.model.clone(),
        state.config.system_prompt.clone(),
        message,
        state.config.max_tokens,
    );
    let timeout = state.config.upstream_timeout;
    let (tx, rx) = mpsc::channel::<std::result::Result<Bytes, Infallible>>(32);
    tokio::spawn(async move {
        let outcome = tokio::time::timeout(timeout, forward(backend, params, &tx)).await;
        let failed = match outcome {
            Ok(Ok(())) => false,
            Ok(Err(err)) => {
                tracing::warn!("upstream stream failed: {err}");
                true
            }
            Err(_) => {
                tracing::warn!("upstream stream exceeded {timeout:?}");
                true
            }
        };
        if failed {
            STREAM_FAILURES.click();
            let notice = Bytes::from_static(STREAM_FAILURE_NOTICE.as_bytes());
            let _ = tx.send(Ok(notice)).await;
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Pulls text deltas from the upstream stream and hands them to the
/// response channel. Returns early without error when the client is gone.
async fn forward(
    backend: Arc<dyn ModelBackend>,
    params: CompletionParams,
    tx: &mpsc::Sender<std::result::Result<Bytes, Infallible>>,
) -> Result<()> {
    let mut events = backend.stream(params).await?;
    while let Some(event) = events.next().await {
        let StreamEvent::TextDelta(text) = event? else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        STREAM_FRAGMENTS.click();
        if tx.send(Ok(Bytes::from(text))).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// Returns follow-up suggestions for the latest exchange. Always succeeds;
/// an unconfigured backend or any generation failure yields an empty list.
async fn suggest_handler(State(state): State<RelayState>, body: Bytes) -> Json<SuggestResponse> {
    let request: SuggestRequest = serde_json::from_slice(&body).unwrap_or_default();
    let suggestions = match &state.backend {
        Some(backend) => {
            suggest::generate(backend, &state.config, &request.message, &request.assistant).await
        }
        None => Vec::new(),
    };
    Json(SuggestResponse { suggestions })
}
