use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{parse_json, SharedState};
use crate::auth::{self, Access};
use crate::error::ApiError;
use crate::serializers;
use crate::store::{BoardPatch, NewBoard};

#[derive(Deserialize)]
struct BoardPayload {
    name: Option<String>,
    description: Option<String>,
}

pub async fn list_boards(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let boards = state.store.list_boards()?;
    let body = boards
        .iter()
        .map(|board| serializers::board_list_json(state.store.as_ref(), board))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(Json(Value::Array(body)).into_response())
}

pub async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let board = state
        .store
        .find_board(id)?
        .ok_or(ApiError::NotFound("board"))?;
    let body = serializers::board_detail_json(state.store.as_ref(), &board)?;
    Ok(Json(body).into_response())
}

pub async fn create_board(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: BoardPayload = parse_json(&body)?;
    let name = payload.name.ok_or_else(|| ApiError::missing_field("name"))?;
    let board = state.store.insert_board(NewBoard {
        id: Uuid::new_v4(),
        name,
        description: payload.description.unwrap_or_default(),
    })?;
    let body = serializers::board_list_json(state.store.as_ref(), &board)?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn update_board(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: BoardPayload = parse_json(&body)?;
    let board = state
        .store
        .update_board(
            id,
            BoardPatch {
                name: payload.name,
                description: payload.description,
            },
        )?
        .ok_or(ApiError::NotFound("board"))?;
    let body = serializers::board_list_json(state.store.as_ref(), &board)?;
    Ok(Json(body).into_response())
}

pub async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    if !state.store.delete_board(id)? {
        return Err(ApiError::NotFound("board"));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}
