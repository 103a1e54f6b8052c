//! `stocklink-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: tokens are validated into claims, claims
//! are resolved into a [`Principal`] once per request, and route groups check
//! the principal's [`BranchRole`].

pub mod authorize;
pub mod claims;
pub mod roles;

pub use authorize::{Access, AuthzError, Principal, authorize};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use roles::{BranchRole, Role};
