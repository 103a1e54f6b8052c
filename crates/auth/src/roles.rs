use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role (group) name as carried in tokens.
///
/// Opaque at this layer; [`BranchRole::resolve`] interprets the branch groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::ADMIN)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the transfer workflow a user works on.
///
/// The two branch groups are disjoint: a requester (Queimados) builds carts and
/// confirms receipt, a supplier (Austin) picks and dispatches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchRole {
    Requester,
    Supplier,
}

impl BranchRole {
    /// Group name used in tokens.
    pub fn group(self) -> &'static str {
        match self {
            BranchRole::Requester => "QUEIMADOS",
            BranchRole::Supplier => "AUSTIN",
        }
    }

    /// Where a user of this role lands after login.
    pub fn landing_path(self) -> &'static str {
        match self {
            BranchRole::Requester => "/queimados/products",
            BranchRole::Supplier => "/austin/orders",
        }
    }

    /// Resolve the branch role from token roles.
    ///
    /// Requester wins when a token (incorrectly) carries both groups, matching
    /// the order in which the landing page is chosen.
    pub fn resolve(roles: &[Role]) -> Option<BranchRole> {
        let has = |role: BranchRole| {
            roles.iter().any(|r| {
                r.as_str().eq_ignore_ascii_case(role.group())
                    || r.as_str().eq_ignore_ascii_case(role.alias())
            })
        };

        if has(BranchRole::Requester) {
            Some(BranchRole::Requester)
        } else if has(BranchRole::Supplier) {
            Some(BranchRole::Supplier)
        } else {
            None
        }
    }

    fn alias(self) -> &'static str {
        match self {
            BranchRole::Requester => "requester",
            BranchRole::Supplier => "supplier",
        }
    }
}

impl core::fmt::Display for BranchRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.group())
    }
}
