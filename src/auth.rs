//! Token authentication and the read/write authorization gate.
//!
//! Reads are open to any authenticated caller; mutations require the staff
//! or superuser flag. The decision is re-derived from the caller's stored
//! record on every request, so revoking a token or a flag takes effect
//! immediately.

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{KanbanStore, User};

#[derive(Debug, Clone)]
pub struct Caller {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        Caller {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Mutate,
}

impl Caller {
    fn is_privileged(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Resolves the caller from the `Authorization: Bearer` header. A missing,
/// malformed, or unknown token yields `None` (unauthenticated).
pub fn authenticate(
    store: &dyn KanbanStore,
    headers: &HeaderMap,
) -> Result<Option<Caller>, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    Ok(store.find_user_by_token(token)?.map(Caller::from))
}

pub fn check(caller: Option<&Caller>, access: Access) -> Result<(), ApiError> {
    let caller = caller.ok_or(ApiError::Unauthorized)?;
    match access {
        Access::Read => Ok(()),
        Access::Mutate if caller.is_privileged() => Ok(()),
        Access::Mutate => Err(ApiError::Forbidden),
    }
}

/// Authenticates and checks in one step; handlers call this first.
pub fn require(
    store: &dyn KanbanStore,
    headers: &HeaderMap,
    access: Access,
) -> Result<Caller, ApiError> {
    match authenticate(store, headers)? {
        Some(caller) => {
            check(Some(&caller), access)?;
            Ok(caller)
        }
        None => Err(ApiError::Unauthorized),
    }
}
