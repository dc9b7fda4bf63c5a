//! Read-only HTTP endpoint
//!
//! Serves the latest round and prediction. Handlers only read shared state,
//! so they answer immediately whatever the feed connection is doing.

use crate::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sicbo_networking::ConnectionState;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Connection and history summary for `/api/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connection_state: ConnectionState,
    pub history_length: usize,
    pub history_capacity: usize,
    pub rounds_seen: u64,
    pub reconnects: u64,
    pub decode_errors: u64,
    pub snapshots_published: u64,
    pub predictor: String,
}

/// Build the axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/snapshot", get(handle_snapshot))
        .route("/api/status", get(handle_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /: landing page
async fn serve_index() -> Html<&'static str> {
    Html(
        "<h2>Sicbo live feed</h2>\
         <p>Latest round and prediction as JSON: <a href=\"/api/snapshot\">/api/snapshot</a></p>",
    )
}

/// GET /api/snapshot: latest round plus prediction
async fn handle_snapshot(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let body = serde_json::to_string_pretty(&state.publisher.current()).map_err(|e| {
        error!("Snapshot serialization failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json; charset=utf-8")], body))
}

/// GET /api/status: feed connection summary
async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (rounds_seen, reconnects, decode_errors) = state
        .feed
        .as_ref()
        .map(|f| (f.rounds_seen(), f.reconnects(), f.decode_errors()))
        .unwrap_or((0, 0, 0));

    Json(StatusResponse {
        connection_state: state.connection_state(),
        history_length: state.history.len(),
        history_capacity: state.history.capacity(),
        rounds_seen,
        reconnects,
        decode_errors,
        snapshots_published: state.publisher.updates(),
        predictor: state.publisher.predictor_name().to_string(),
    })
}
