//! Small JSON endpoints beside the websocket.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{Value, json};
use tracing::warn;

use crate::state::AppState;

/// `GET /api/ping`: liveness check used by the front end.
pub async fn ping() -> Json<Value> {
    Json(json!({ "reply": "pong" }))
}

/// `GET /api/new-board`: board geometry for the game view, read from
/// `BOARD_GEOMETRY_PATH` on each request.
pub async fn new_board(State(state): State<AppState>) -> Response {
    let Some(path) = state.config.board_geometry_path.as_ref() else {
        return (StatusCode::NOT_FOUND, "board geometry not configured").into_response();
    };

    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "api: board geometry unreadable");
            (StatusCode::NOT_FOUND, "board geometry unavailable").into_response()
        }
    }
}
