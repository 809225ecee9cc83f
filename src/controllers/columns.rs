use axum::body::Bytes;
use axum::extract::{Path, Query, State};
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
use crate::store::{ColumnPatch, NewColumn};

const DEFAULT_COLUMN_COLOR: &str = "#2a92bf";

#[derive(Deserialize)]
struct ColumnPayload {
    board: Option<Uuid>,
    name: Option<String>,
    position: Option<i32>,
    color: Option<String>,
}

#[derive(Deserialize)]
pub struct ColumnListQuery {
    board: Option<Uuid>,
}

pub async fn list_columns(
    State(state): State<SharedState>,
    Query(query): Query<ColumnListQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let columns = state.store.list_columns(query.board)?;
    let body = columns
        .iter()
        .map(|column| serializers::column_list_json(state.store.as_ref(), column))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(Json(Value::Array(body)).into_response())
}

pub async fn get_column(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let column = state
        .store
        .find_column(id)?
        .ok_or(ApiError::NotFound("column"))?;
    let body = serializers::column_detail_json(state.store.as_ref(), &column)?;
    Ok(Json(body).into_response())
}

pub async fn create_column(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: ColumnPayload = parse_json(&body)?;
    let board_id = payload
        .board
        .ok_or_else(|| ApiError::missing_field("board"))?;
    let name = payload.name.ok_or_else(|| ApiError::missing_field("name"))?;
    if state.store.find_board(board_id)?.is_none() {
        return Err(ApiError::NotFound("board"));
    }
    let column = state.store.insert_column(NewColumn {
        id: Uuid::new_v4(),
        board_id,
        name,
        position: payload.position.unwrap_or(0),
        color: payload
            .color
            .unwrap_or_else(|| DEFAULT_COLUMN_COLOR.to_string()),
    })?;
    let body = serializers::column_list_json(state.store.as_ref(), &column)?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn update_column(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: ColumnPayload = parse_json(&body)?;
    if let Some(board_id) = payload.board {
        if state.store.find_board(board_id)?.is_none() {
            return Err(ApiError::NotFound("board"));
        }
    }
    let column = state
        .store
        .update_column(
            id,
            ColumnPatch {
                board_id: payload.board,
                name: payload.name,
                position: payload.position,
                color: payload.color,
            },
        )?
        .ok_or(ApiError::NotFound("column"))?;
    let body = serializers::column_list_json(state.store.as_ref(), &column)?;
    Ok(Json(body).into_response())
}

pub async fn delete_column(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    if !state.store.delete_column(id)? {
        return Err(ApiError::NotFound("column"));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}
