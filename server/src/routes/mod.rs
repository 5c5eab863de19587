//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the front-end shell for every page route (`/`,
//! `/lobby/{id}`, `/game/{id}`), its static assets, the small JSON API and
//! the lobby websocket.

pub mod api;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.config.static_dir.clone();
    let shell = ServeFile::new(static_dir.join("index.html"));

    Router::new()
        .route_service("/", shell.clone())
        .route_service("/lobby/{id}", shell.clone())
        .route_service("/game/{id}", shell)
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/api/ping", get(api::ping))
        .route("/api/new-board", get(api::new_board))
        .route("/healthz", get(healthz))
        .route("/ws", get(ws::handle_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
