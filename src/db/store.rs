//! `PgStore`: the Postgres-backed `KanbanStore`.
//!
//! Cascade deletes are explicit transactions here rather than `ON DELETE`
//! clauses in the schema: a board takes its columns and their cards with it,
//! a column takes its cards, and a deleted user leaves their cards behind
//! with `created_by` nulled.

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use super::connection::PgPool;
use super::models::{
    BoardChangeset, BoardRow, CardPlacementChangeset, CardRow, CardTextChangeset, ColumnChangeset,
    ColumnRow, NewBoardRow, NewCardRow, NewColumnRow, NewUserRow, UserRow,
};
use super::schema::{boards, cards, columns, users};
use crate::store::{
    Board, BoardPatch, Card, Column, ColumnPatch, KanbanStore, NewBoard, NewCard, NewColumn,
    NewUser, StoreResult, User,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

impl KanbanStore for PgStore {
    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.pool.get()?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(NewUserRow {
                id: user.id,
                username: &user.username,
                email: &user.email,
                token: &user.token,
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
            })
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .find(id)
            .first::<UserRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .filter(users::token.eq(token))
            .first::<UserRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(cards::table.filter(cards::created_by.eq(id)))
                .set(cards::created_by.eq(None::<Uuid>))
                .execute(conn)?;
            diesel::delete(users::table.find(id)).execute(conn)
        })?;
        Ok(deleted > 0)
    }

    fn list_boards(&self) -> StoreResult<Vec<Board>> {
        let mut conn = self.pool.get()?;
        let rows = boards::table
            .order((boards::created_at.asc(), boards::id.asc()))
            .load::<BoardRow>(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        let mut conn = self.pool.get()?;
        let row = boards::table
            .find(id)
            .first::<BoardRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_board(&self, board: NewBoard) -> StoreResult<Board> {
        let mut conn = self.pool.get()?;
        let row: BoardRow = diesel::insert_into(boards::table)
            .values(NewBoardRow {
                id: board.id,
                name: &board.name,
                description: &board.description,
            })
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_board(&self, id: Uuid, patch: BoardPatch) -> StoreResult<Option<Board>> {
        if patch.name.is_none() && patch.description.is_none() {
            return self.find_board(id);
        }
        let mut conn = self.pool.get()?;
        let row = diesel::update(boards::table.find(id))
            .set(BoardChangeset {
                name: patch.name.as_deref(),
                description: patch.description.as_deref(),
            })
            .get_result::<BoardRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let column_ids = columns::table
                .filter(columns::board_id.eq(id))
                .select(columns::id)
                .load::<Uuid>(conn)?;
            diesel::delete(cards::table.filter(cards::column_id.eq_any(&column_ids)))
                .execute(conn)?;
            diesel::delete(columns::table.filter(columns::board_id.eq(id))).execute(conn)?;
            diesel::delete(boards::table.find(id)).execute(conn)
        })?;
        Ok(deleted > 0)
    }

    fn list_columns(&self, board_id: Option<Uuid>) -> StoreResult<Vec<Column>> {
        let mut conn = self.pool.get()?;
        let mut query = columns::table.into_boxed();
        if let Some(board_id) = board_id {
            query = query.filter(columns::board_id.eq(board_id));
        }
        let rows = query
            .order((columns::position.asc(), columns::id.asc()))
            .load::<ColumnRow>(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>> {
        let mut conn = self.pool.get()?;
        let row = columns::table
            .find(id)
            .first::<ColumnRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_column(&self, column: NewColumn) -> StoreResult<Column> {
        let mut conn = self.pool.get()?;
        let row: ColumnRow = diesel::insert_into(columns::table)
            .values(NewColumnRow {
                id: column.id,
                board_id: column.board_id,
                name: &column.name,
                position: column.position,
                color: &column.color,
            })
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_column(&self, id: Uuid, patch: ColumnPatch) -> StoreResult<Option<Column>> {
        if patch.board_id.is_none()
            && patch.name.is_none()
            && patch.position.is_none()
            && patch.color.is_none()
        {
            return self.find_column(id);
        }
        let mut conn = self.pool.get()?;
        let row = diesel::update(columns::table.find(id))
            .set(ColumnChangeset {
                board_id: patch.board_id,
                name: patch.name.as_deref(),
                position: patch.position,
                color: patch.color.as_deref(),
            })
            .get_result::<ColumnRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn delete_column(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(cards::table.filter(cards::column_id.eq(id))).execute(conn)?;
            diesel::delete(columns::table.find(id)).execute(conn)
        })?;
        Ok(deleted > 0)
    }

    fn list_cards(&self, column_id: Option<Uuid>) -> StoreResult<Vec<Card>> {
        let mut conn = self.pool.get()?;
        let mut query = cards::table.into_boxed();
        if let Some(column_id) = column_id {
            query = query.filter(cards::column_id.eq(column_id));
        }
        let rows = query
            .order((cards::position.asc(), cards::id.asc()))
            .load::<CardRow>(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>> {
        let mut conn = self.pool.get()?;
        let row = cards::table
            .find(id)
            .first::<CardRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn column_cards_ordered(&self, column_id: Uuid) -> StoreResult<Vec<Card>> {
        self.list_cards(Some(column_id))
    }

    fn insert_card(&self, card: NewCard) -> StoreResult<Card> {
        let mut conn = self.pool.get()?;
        let row: CardRow = diesel::insert_into(cards::table)
            .values(NewCardRow {
                id: card.id,
                column_id: card.column_id,
                title: &card.title,
                description: &card.description,
                position: card.position,
                created_by: card.created_by,
            })
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_card_text(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> StoreResult<Option<Card>> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(cards::table.find(id))
            .set(CardTextChangeset {
                title: title.as_deref(),
                description: description.as_deref(),
                updated_at: Utc::now(),
            })
            .get_result::<CardRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn set_card_placement(
        &self,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> StoreResult<Option<Card>> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(cards::table.find(id))
            .set(CardPlacementChangeset {
                column_id,
                position,
                updated_at: Utc::now(),
            })
            .get_result::<CardRow>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn set_card_position(&self, id: Uuid, position: i32) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        diesel::update(cards::table.find(id))
            .set((
                cards::position.eq(position),
                cards::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn delete_card(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(cards::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
