//! Card handlers for both surfaces.
//!
//! The legacy endpoints answer `{success: ...}` envelopes and fold every
//! failure except an authorization denial into a 400, matching the original
//! API's catch-all behavior. The v1 endpoints answer full serialized cards
//! with conventional status codes.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{parse_json, AppState, SharedState};
use crate::auth::{self, Access};
use crate::cards::{self, CreateCard};
use crate::error::ApiError;
use crate::serializers;

// ── legacy surface ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LegacyCreatePayload {
    column_id: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct LegacyUpdatePayload {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct LegacyMovePayload {
    column_id: Option<Uuid>,
    position: Option<i32>,
}

fn legacy_response(result: Result<Value, ApiError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err @ (ApiError::Unauthorized | ApiError::Forbidden)) => err.into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

pub async fn legacy_create_card(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    legacy_response(legacy_create(&state, &headers, &body).await)
}

async fn legacy_create(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Value, ApiError> {
    let caller = auth::require(state.store.as_ref(), headers, Access::Mutate)?;
    let payload: LegacyCreatePayload = parse_json(body)?;
    let column_id = payload
        .column_id
        .ok_or_else(|| ApiError::missing_field("column_id"))?;
    let card = cards::create(
        state.store.as_ref(),
        &state.locks,
        CreateCard {
            column_id,
            title: payload.title.unwrap_or_else(|| "New Task".to_string()),
            description: payload.description.unwrap_or_default(),
            created_by: Some(caller.id),
        },
    )
    .await?;
    Ok(json!({
        "success": true,
        "card": {
            "id": card.id,
            "title": card.title,
            "description": card.description,
            "position": card.position,
            "created_by": caller.username,
        }
    }))
}

pub async fn legacy_update_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    legacy_response(legacy_update(&state, id, &headers, &body))
}

fn legacy_update(
    state: &AppState,
    id: Uuid,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Value, ApiError> {
    auth::require(state.store.as_ref(), headers, Access::Mutate)?;
    let payload: LegacyUpdatePayload = parse_json(body)?;
    cards::update_text(state.store.as_ref(), id, payload.title, payload.description)?;
    Ok(json!({"success": true}))
}

pub async fn legacy_move_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    legacy_response(legacy_move(&state, id, &headers, &body).await)
}

async fn legacy_move(
    state: &AppState,
    id: Uuid,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Value, ApiError> {
    auth::require(state.store.as_ref(), headers, Access::Mutate)?;
    let payload: LegacyMovePayload = parse_json(body)?;
    let column_id = payload
        .column_id
        .ok_or_else(|| ApiError::missing_field("column_id"))?;
    cards::move_card(
        state.store.as_ref(),
        &state.locks,
        id,
        column_id,
        payload.position.unwrap_or(0),
    )
    .await?;
    Ok(json!({"success": true}))
}

pub async fn legacy_delete_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    legacy_response(legacy_delete(&state, id, &headers).await)
}

async fn legacy_delete(state: &AppState, id: Uuid, headers: &HeaderMap) -> Result<Value, ApiError> {
    auth::require(state.store.as_ref(), headers, Access::Mutate)?;
    cards::delete(state.store.as_ref(), &state.locks, id).await?;
    Ok(json!({"success": true}))
}

// ── v1 REST surface ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct CardPayload {
    column: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct MoveCardPayload {
    column_id: Option<Uuid>,
    position: Option<i32>,
}

#[derive(Deserialize)]
pub struct CardListQuery {
    column: Option<Uuid>,
}

pub async fn list_cards(
    State(state): State<SharedState>,
    Query(query): Query<CardListQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let cards = state.store.list_cards(query.column)?;
    let body = cards
        .iter()
        .map(|card| serializers::card_json(state.store.as_ref(), card))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(Json(Value::Array(body)).into_response())
}

pub async fn get_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Read)?;
    let card = state.store.find_card(id)?.ok_or(ApiError::NotFound("card"))?;
    let body = serializers::card_json(state.store.as_ref(), &card)?;
    Ok(Json(body).into_response())
}

pub async fn create_card(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let caller = auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: CardPayload = parse_json(&body)?;
    let column_id = payload
        .column
        .ok_or_else(|| ApiError::missing_field("column"))?;
    let title = payload
        .title
        .ok_or_else(|| ApiError::missing_field("title"))?;
    // The card always appends; a client-supplied position on create would
    // let the column go non-dense.
    let card = cards::create(
        state.store.as_ref(),
        &state.locks,
        CreateCard {
            column_id,
            title,
            description: payload.description.unwrap_or_default(),
            created_by: Some(caller.id),
        },
    )
    .await?;
    let body = serializers::card_json(state.store.as_ref(), &card)?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn update_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: LegacyUpdatePayload = parse_json(&body)?;
    let card = cards::update_text(
        state.store.as_ref(),
        id,
        payload.title,
        payload.description,
    )?;
    let body = serializers::card_json(state.store.as_ref(), &card)?;
    Ok(Json(body).into_response())
}

pub async fn delete_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    cards::delete(state.store.as_ref(), &state.locks, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn move_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    auth::require(state.store.as_ref(), &headers, Access::Mutate)?;
    let payload: MoveCardPayload = parse_json(&body)?;
    let column_id = payload
        .column_id
        .ok_or_else(|| ApiError::missing_field("column_id"))?;
    let position = payload
        .position
        .ok_or_else(|| ApiError::missing_field("position"))?;
    let card = cards::move_card(state.store.as_ref(), &state.locks, id, column_id, position).await?;
    let body = json!({
        "status": "success",
        "message": "Card moved successfully.",
        "card": serializers::card_json(state.store.as_ref(), &card)?,
    });
    Ok(Json(body).into_response())
}
