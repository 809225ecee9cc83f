//! In-memory `KanbanStore` used by the unit and router tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{
    Board, BoardPatch, Card, Column, ColumnPatch, KanbanStore, NewBoard, NewCard, NewColumn,
    NewUser, StoreError, StoreResult, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    boards: HashMap<Uuid, Board>,
    columns: HashMap<Uuid, Column>,
    cards: HashMap<Uuid, Card>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KanbanStore for MemoryStore {
    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let user = User {
            id: user.id,
            username: user.username,
            email: user.email,
            token: user.token,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        self.tables()?.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.token == token)
            .cloned())
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        for card in tables.cards.values_mut() {
            if card.created_by == Some(id) {
                card.created_by = None;
            }
        }
        Ok(true)
    }

    fn list_boards(&self) -> StoreResult<Vec<Board>> {
        let tables = self.tables()?;
        let mut boards: Vec<Board> = tables.boards.values().cloned().collect();
        boards.sort_by_key(|b| (b.created_at, b.id));
        Ok(boards)
    }

    fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.tables()?.boards.get(&id).cloned())
    }

    fn insert_board(&self, board: NewBoard) -> StoreResult<Board> {
        let board = Board {
            id: board.id,
            name: board.name,
            description: board.description,
            created_at: Utc::now(),
        };
        self.tables()?.boards.insert(board.id, board.clone());
        Ok(board)
    }

    fn update_board(&self, id: Uuid, patch: BoardPatch) -> StoreResult<Option<Board>> {
        let mut tables = self.tables()?;
        let Some(board) = tables.boards.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            board.name = name;
        }
        if let Some(description) = patch.description {
            board.description = description;
        }
        Ok(Some(board.clone()))
    }

    fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        if tables.boards.remove(&id).is_none() {
            return Ok(false);
        }
        let column_ids: Vec<Uuid> = tables
            .columns
            .values()
            .filter(|c| c.board_id == id)
            .map(|c| c.id)
            .collect();
        tables.columns.retain(|_, c| c.board_id != id);
        tables
            .cards
            .retain(|_, card| !column_ids.contains(&card.column_id));
        Ok(true)
    }

    fn list_columns(&self, board_id: Option<Uuid>) -> StoreResult<Vec<Column>> {
        let tables = self.tables()?;
        let mut columns: Vec<Column> = tables
            .columns
            .values()
            .filter(|c| board_id.map_or(true, |b| c.board_id == b))
            .cloned()
            .collect();
        columns.sort_by_key(|c| (c.position, c.id));
        Ok(columns)
    }

    fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>> {
        Ok(self.tables()?.columns.get(&id).cloned())
    }

    fn insert_column(&self, column: NewColumn) -> StoreResult<Column> {
        let column = Column {
            id: column.id,
            board_id: column.board_id,
            name: column.name,
            position: column.position,
            color: column.color,
        };
        self.tables()?.columns.insert(column.id, column.clone());
        Ok(column)
    }

    fn update_column(&self, id: Uuid, patch: ColumnPatch) -> StoreResult<Option<Column>> {
        let mut tables = self.tables()?;
        let Some(column) = tables.columns.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(board_id) = patch.board_id {
            column.board_id = board_id;
        }
        if let Some(name) = patch.name {
            column.name = name;
        }
        if let Some(position) = patch.position {
            column.position = position;
        }
        if let Some(color) = patch.color {
            column.color = color;
        }
        Ok(Some(column.clone()))
    }

    fn delete_column(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        if tables.columns.remove(&id).is_none() {
            return Ok(false);
        }
        tables.cards.retain(|_, card| card.column_id != id);
        Ok(true)
    }

    fn list_cards(&self, column_id: Option<Uuid>) -> StoreResult<Vec<Card>> {
        let tables = self.tables()?;
        let mut cards: Vec<Card> = tables
            .cards
            .values()
            .filter(|card| column_id.map_or(true, |c| card.column_id == c))
            .cloned()
            .collect();
        cards.sort_by_key(|card| (card.position, card.id));
        Ok(cards)
    }

    fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>> {
        Ok(self.tables()?.cards.get(&id).cloned())
    }

    fn column_cards_ordered(&self, column_id: Uuid) -> StoreResult<Vec<Card>> {
        self.list_cards(Some(column_id))
    }

    fn insert_card(&self, card: NewCard) -> StoreResult<Card> {
        let now = Utc::now();
        let card = Card {
            id: card.id,
            column_id: card.column_id,
            title: card.title,
            description: card.description,
            position: card.position,
            created_by: card.created_by,
            created_at: now,
            updated_at: now,
        };
        self.tables()?.cards.insert(card.id, card.clone());
        Ok(card)
    }

    fn update_card_text(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> StoreResult<Option<Card>> {
        let mut tables = self.tables()?;
        let Some(card) = tables.cards.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            card.title = title;
        }
        if let Some(description) = description {
            card.description = description;
        }
        card.updated_at = Utc::now();
        Ok(Some(card.clone()))
    }

    fn set_card_placement(
        &self,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> StoreResult<Option<Card>> {
        let mut tables = self.tables()?;
        let Some(card) = tables.cards.get_mut(&id) else {
            return Ok(None);
        };
        card.column_id = column_id;
        card.position = position;
        card.updated_at = Utc::now();
        Ok(Some(card.clone()))
    }

    fn set_card_position(&self, id: Uuid, position: i32) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if let Some(card) = tables.cards.get_mut(&id) {
            card.position = position;
            card.updated_at = Utc::now();
        }
        Ok(())
    }

    fn delete_card(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables()?.cards.remove(&id).is_some())
    }
}
