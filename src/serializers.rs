//! JSON views for the v1 REST surface.
//!
//! Shapes mirror the public API: a card embeds its creator, a column embeds
//! its cards (detail) or just a count (list), a board embeds its columns.

use serde_json::{json, Value};

use crate::store::{Board, Card, Column, KanbanStore, StoreResult, User};

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
    })
}

pub fn card_json(store: &dyn KanbanStore, card: &Card) -> StoreResult<Value> {
    let created_by = match card.created_by {
        Some(user_id) => store
            .find_user(user_id)?
            .map(|u| user_json(&u))
            .unwrap_or(Value::Null),
        None => Value::Null,
    };
    Ok(json!({
        "id": card.id,
        "column": card.column_id,
        "title": card.title,
        "description": card.description,
        "position": card.position,
        "created_by": created_by,
        "created_at": card.created_at,
        "updated_at": card.updated_at,
    }))
}

pub fn column_list_json(store: &dyn KanbanStore, column: &Column) -> StoreResult<Value> {
    let cards_count = store.column_cards_ordered(column.id)?.len();
    Ok(json!({
        "id": column.id,
        "board": column.board_id,
        "name": column.name,
        "position": column.position,
        "color": column.color,
        "cards_count": cards_count,
    }))
}

pub fn column_detail_json(store: &dyn KanbanStore, column: &Column) -> StoreResult<Value> {
    let cards = store.column_cards_ordered(column.id)?;
    let card_values = cards
        .iter()
        .map(|card| card_json(store, card))
        .collect::<StoreResult<Vec<Value>>>()?;
    Ok(json!({
        "id": column.id,
        "board": column.board_id,
        "name": column.name,
        "position": column.position,
        "color": column.color,
        "cards": card_values,
        "cards_count": cards.len(),
    }))
}

fn board_json_with(
    store: &dyn KanbanStore,
    board: &Board,
    column_view: impl Fn(&dyn KanbanStore, &Column) -> StoreResult<Value>,
) -> StoreResult<Value> {
    let columns = store.list_columns(Some(board.id))?;
    let mut total_cards = 0;
    let mut column_values = Vec::with_capacity(columns.len());
    for column in &columns {
        total_cards += store.column_cards_ordered(column.id)?.len();
        column_values.push(column_view(store, column)?);
    }
    Ok(json!({
        "id": board.id,
        "name": board.name,
        "description": board.description,
        "created_at": board.created_at,
        "columns": column_values,
        "total_cards": total_cards,
    }))
}

pub fn board_list_json(store: &dyn KanbanStore, board: &Board) -> StoreResult<Value> {
    board_json_with(store, board, column_list_json)
}

pub fn board_detail_json(store: &dyn KanbanStore, board: &Board) -> StoreResult<Value> {
    board_json_with(store, board, column_detail_json)
}
