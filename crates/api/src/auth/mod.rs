//! Bearer-token authentication.
//!
//! Tokens are issued by the organization's identity service and signed with
//! the shared `JWT_SECRET`; this service only validates them. [`jwt`] also
//! exposes token generation for tests and local tooling.

pub mod jwt;
