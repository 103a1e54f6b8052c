use stocklink_auth::{BranchRole, Principal};
use stocklink_core::{Actor, UserId};

/// Principal context for a request (authenticated identity + branch group).
///
/// Resolved once by the auth middleware and read by gates and handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn branch_role(&self) -> Option<BranchRole> {
        self.principal.branch_role
    }

    pub fn actor(&self) -> Actor {
        self.principal.actor()
    }
}
