//! User domain model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Largest user id that still fits the 8-digit field of a card number
pub const MAX_USER_ID: i64 = 99_999_999;

/// Immutable identifier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Result<Self> {
        if !(1..=MAX_USER_ID).contains(&id) {
            return Err(Error::validation(format!(
                "user id must be between 1 and {}, got {}",
                MAX_USER_ID, id
            )));
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bank user. Owns cards; holds the hash of the PIN issued with the
/// most recent card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
