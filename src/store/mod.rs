//! Persistence for registered users.

mod postgres;

pub use postgres::PgUserStore;

use crate::error::Result;
use async_trait::async_trait;

pub const STATUS_REGISTERED: &str = "registered";

/// Insert-side user record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_name: String,
    pub status: String,
}

impl NewUser {
    pub fn registered(user_id: impl Into<String>) -> Self {
        Self {
            user_name: user_id.into(),
            status: STATUS_REGISTERED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: i32,
    /// LINE user identifier taken from the sender's profile.
    pub user_name: String,
    pub status: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a row. Duplicate registrations for the same user are allowed.
    async fn insert_user(&self, user: &NewUser) -> Result<RegisteredUser>;

    /// Whether the backing database answers.
    async fn ping(&self) -> bool;
}
