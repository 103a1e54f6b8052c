//! Who did something.
//!
//! Every command and event that a person triggers carries an [`Actor`]. It is
//! compared by value and never looked up again, so renaming a user does not
//! rewrite history.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// The user behind an action, captured by value at the time it happened.
///
/// Events carry the username alongside the id so that reports and the audit
/// log can render who did what without a user directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
}

impl Actor {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.username)
    }
}
