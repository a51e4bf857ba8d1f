//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the calling actor, resolved from a Bearer token.
//! - [`rbac::RequireAdmin`]: requires an active admin profile.

pub mod auth;
pub mod rbac;
