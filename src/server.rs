//! HTTP surface: webhook intake, event readback, health and info routes.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::normalize::{self, IgnoreReason, Outcome};
use crate::record::EventRecord;
use crate::store::EventStore;

const DEFAULT_READ_LIMIT: usize = 1;
const MAX_READ_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

#[derive(Serialize)]
struct WebhookResponse {
    message: String,
    stored: bool,
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/webhook", post(handle_webhook))
        .route("/events", get(latest_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<WebhookResponse>, StatusCode> {
    let event_kind = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        error!("failed to decode {} delivery as JSON: {}", event_kind, e);
        StatusCode::BAD_REQUEST
    })?;

    let outcome = normalize::normalize(event_kind, &payload).map_err(|e| {
        warn!("rejected {} delivery: {}", event_kind, e);
        StatusCode::BAD_REQUEST
    })?;

    match outcome {
        Outcome::Event(record) => {
            info!(
                kind = %record.kind,
                author = %record.author,
                to_branch = %record.to_branch,
                "storing event"
            );
            state.store.insert(record).await.map_err(|e| {
                error!("failed to store {} event: {}", event_kind, e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(Json(WebhookResponse {
                message: format!("{} event stored", event_kind),
                stored: true,
            }))
        }
        Outcome::Ignored(IgnoreReason::Ping) => {
            info!("ping delivery - webhook is configured correctly");
            Ok(Json(WebhookResponse {
                message: "pong".to_string(),
                stored: false,
            }))
        }
        Outcome::Ignored(IgnoreReason::UnsupportedAction) => {
            info!("ignoring {} delivery with unsupported action", event_kind);
            Ok(Json(WebhookResponse {
                message: format!("{} action ignored", event_kind),
                stored: false,
            }))
        }
        Outcome::Ignored(IgnoreReason::UnknownEvent) => {
            info!("unhandled event type: {}", event_kind);
            Ok(Json(WebhookResponse {
                message: format!("unsupported event type: {}", event_kind),
                stored: false,
            }))
        }
    }
}

async fn latest_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<EventRecord>>, StatusCode> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_READ_LIMIT)
        .clamp(1, MAX_READ_LIMIT);

    let records = state.store.latest(limit).await.map_err(|e| {
        error!("failed to read latest events: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(records))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "hookline",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "GitHub Event Recorder",
        "endpoints": {
            "webhook": "/webhook",
            "events": "/events",
            "health": "/health",
            "info": "/"
        },
        "supported_events": [
            "push",
            "pull_request",
            "ping"
        ]
    }))
}
