//! The persistence seam of the service.
//!
//! `KanbanStore` is everything the card operations and controllers need from
//! storage: entity lookups, ordered card reads, and the two narrow position
//! writes the sequencer performs. `PgStore` (in `crate::db`) backs it with
//! Postgres; `MemoryStore` backs it for tests.

pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("storage lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct NewBoard {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewColumn {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnPatch {
    pub board_id: Option<Uuid>,
    pub name: Option<String>,
    pub position: Option<i32>,
    pub color: Option<String>,
}

pub trait KanbanStore: Send + Sync {
    // users
    fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>>;
    /// Removes the user and nullifies `created_by` on their cards.
    fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // boards
    fn list_boards(&self) -> StoreResult<Vec<Board>>;
    fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>>;
    fn insert_board(&self, board: NewBoard) -> StoreResult<Board>;
    fn update_board(&self, id: Uuid, patch: BoardPatch) -> StoreResult<Option<Board>>;
    /// Removes the board, its columns, and their cards.
    fn delete_board(&self, id: Uuid) -> StoreResult<bool>;

    // columns
    fn list_columns(&self, board_id: Option<Uuid>) -> StoreResult<Vec<Column>>;
    fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>>;
    fn insert_column(&self, column: NewColumn) -> StoreResult<Column>;
    fn update_column(&self, id: Uuid, patch: ColumnPatch) -> StoreResult<Option<Column>>;
    /// Removes the column and its cards.
    fn delete_column(&self, id: Uuid) -> StoreResult<bool>;

    // cards
    fn list_cards(&self, column_id: Option<Uuid>) -> StoreResult<Vec<Card>>;
    fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>>;
    /// Cards of one column ordered by `(position, id)` ascending. The id
    /// tie-break keeps the order total even when positions collide.
    fn column_cards_ordered(&self, column_id: Uuid) -> StoreResult<Vec<Card>>;
    fn insert_card(&self, card: NewCard) -> StoreResult<Card>;
    fn update_card_text(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
    ) -> StoreResult<Option<Card>>;
    /// The raw move write: reassigns column and position as requested,
    /// without range checks. Callers renumber afterwards.
    fn set_card_placement(&self, id: Uuid, column_id: Uuid, position: i32)
        -> StoreResult<Option<Card>>;
    /// Single-field position write used by the sequencer.
    fn set_card_position(&self, id: Uuid, position: i32) -> StoreResult<()>;
    fn delete_card(&self, id: Uuid) -> StoreResult<bool>;
}
