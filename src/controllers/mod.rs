//! HTTP transport: routes, shared state, and the request handlers for both
//! API surfaces (the legacy `{success, ...}` endpoints and the v1 REST
//! resources).

pub mod boards;
pub mod cards;
pub mod columns;

use std::sync::Arc;

use axum::body::Bytes;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::cards::ColumnLocks;
use crate::error::ApiError;
use crate::store::KanbanStore;

pub struct AppState {
    pub store: Arc<dyn KanbanStore>,
    pub locks: ColumnLocks,
}

impl AppState {
    pub fn new(store: Arc<dyn KanbanStore>) -> Self {
        AppState {
            store,
            locks: ColumnLocks::default(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Bodies are read raw and parsed here so a malformed payload is always a
/// 400, mirroring the framework-level parse handling of the original API.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(format!("JSON parse error - {err}")))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        // legacy surface
        .route("/api/card/create", post(cards::legacy_create_card))
        .route("/api/card/{id}/update", put(cards::legacy_update_card))
        .route("/api/card/{id}/move", post(cards::legacy_move_card))
        .route("/api/card/{id}/delete", delete(cards::legacy_delete_card))
        // v1 REST surface
        .route(
            "/api/v1/boards/",
            get(boards::list_boards).post(boards::create_board),
        )
        .route(
            "/api/v1/boards/{id}/",
            get(boards::get_board)
                .put(boards::update_board)
                .patch(boards::update_board)
                .delete(boards::delete_board),
        )
        .route(
            "/api/v1/columns/",
            get(columns::list_columns).post(columns::create_column),
        )
        .route(
            "/api/v1/columns/{id}/",
            get(columns::get_column)
                .put(columns::update_column)
                .patch(columns::update_column)
                .delete(columns::delete_column),
        )
        .route(
            "/api/v1/cards/",
            get(cards::list_cards).post(cards::create_card),
        )
        .route(
            "/api/v1/cards/{id}/",
            get(cards::get_card)
                .put(cards::update_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/api/v1/cards/{id}/move/", post(cards::move_card))
        .with_state(state)
}
