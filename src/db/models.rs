//! Diesel row types for the Postgres store, mapped to the domain structs in
//! `crate::store` at the boundary.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{boards, cards, columns, users};
use crate::store::{Board, Card, Column, User};

#[derive(Queryable)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            token: row.token,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub token: &'a str,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Queryable)]
pub struct BoardRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Board {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = boards)]
pub struct NewBoardRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(AsChangeset)]
#[diesel(table_name = boards)]
pub struct BoardChangeset<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(Queryable)]
pub struct ColumnRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
    pub color: String,
}

impl From<ColumnRow> for Column {
    fn from(row: ColumnRow) -> Self {
        Column {
            id: row.id,
            board_id: row.board_id,
            name: row.name,
            position: row.position,
            color: row.color,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = columns)]
pub struct NewColumnRow<'a> {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: &'a str,
    pub position: i32,
    pub color: &'a str,
}

#[derive(AsChangeset)]
#[diesel(table_name = columns)]
pub struct ColumnChangeset<'a> {
    pub board_id: Option<Uuid>,
    pub name: Option<&'a str>,
    pub position: Option<i32>,
    pub color: Option<&'a str>,
}

#[derive(Queryable)]
pub struct CardRow {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: row.id,
            column_id: row.column_id,
            title: row.title,
            description: row.description,
            position: row.position,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = cards)]
pub struct NewCardRow<'a> {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub position: i32,
    pub created_by: Option<Uuid>,
}

/// Text-field update; `updated_at` is always written so the changeset is
/// never empty.
#[derive(AsChangeset)]
#[diesel(table_name = cards)]
pub struct CardTextChangeset<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = cards)]
pub struct CardPlacementChangeset {
    pub column_id: Uuid,
    pub position: i32,
    pub updated_at: DateTime<Utc>,
}
