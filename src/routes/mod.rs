//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the HTTP board and chat endpoints and the realtime
//! websocket endpoint under a single Axum router.

pub mod auth;
pub mod columns;
pub mod messages;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Board, chat, and websocket routes.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/columns", get(columns::list_columns).post(columns::create_column))
        .route("/columns/{column_id}", delete(columns::delete_column))
        .route("/columns/{column_id}/cards", post(columns::create_card))
        .route("/columns/{column_id}/cards/reorder", patch(columns::reorder_cards))
        .route("/columns/{column_id}/cards/{card_id}", delete(columns::delete_card))
        .route("/cards/{card_id}/move", patch(columns::move_card))
        .route("/messages/{id}", get(messages::history).delete(messages::delete_message))
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
