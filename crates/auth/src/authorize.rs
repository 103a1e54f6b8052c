use serde::Serialize;
use thiserror::Error;

use stocklink_core::{Actor, UserId};

use crate::{BranchRole, JwtClaims, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built once per request from validated claims; handlers receive it
/// explicitly instead of looking up group membership themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
    pub branch_role: Option<BranchRole>,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        let branch_role = BranchRole::resolve(&roles);
        Self {
            user_id,
            username: username.into(),
            roles,
            branch_role,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.username.clone(), claims.roles.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }

    /// The principal as recorded on events.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone())
    }
}

/// What a route group requires from the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    /// Any authenticated user.
    Authenticated,
    /// Members of one branch group.
    Branch(BranchRole),
    /// Catalog administrators.
    Admin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user has no branch group")]
    NoBranchRole,

    #[error("forbidden: requires branch {required}")]
    WrongBranch {
        required: BranchRole,
        actual: Option<BranchRole>,
    },

    #[error("forbidden: requires admin")]
    NotAdmin,
}

/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: Access) -> Result<(), AuthzError> {
    match required {
        Access::Authenticated => Ok(()),
        Access::Admin if principal.is_admin() => Ok(()),
        Access::Admin => Err(AuthzError::NotAdmin),
        Access::Branch(role) => match principal.branch_role {
            Some(actual) if actual == role => Ok(()),
            None => Err(AuthzError::NoBranchRole),
            actual => Err(AuthzError::WrongBranch {
                required: role,
                actual,
            }),
        },
    }
}
