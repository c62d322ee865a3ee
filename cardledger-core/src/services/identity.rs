//! Identity service - resolves the caller once at the boundary

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{User, UserId};
use crate::ports::Repository;

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    user: User,
}

impl Caller {
    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn user(&self) -> &User {
        &self.user
    }
}

pub struct IdentityService {
    repository: Arc<dyn Repository>,
}

impl IdentityService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Resolve a raw user id into a caller
    pub fn resolve(&self, user_id: i64) -> Result<Caller> {
        let id = UserId::new(user_id).map_err(|_| Error::UserNotFound)?;
        let user = self.repository.find_user(id)?.ok_or(Error::UserNotFound)?;
        Ok(Caller { user })
    }

    /// Create a user. Registration proper lives outside this crate; this is
    /// the minimal path for operators and tests.
    pub fn register(&self, email: &str) -> Result<User> {
        let email = email.trim();
        let well_formed = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !well_formed {
            return Err(Error::validation(format!("invalid email address: {}", email)));
        }
        self.repository.create_user(&email.to_lowercase())
    }
}
