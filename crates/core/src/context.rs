//! Explicit per-request context passed into every workflow call.

use chrono::Datelike;

use crate::scope::Actor;
use crate::types::{Date, Timestamp};

/// Who is acting and when.
///
/// Built once per request by the caller; the core never reads ambient
/// "current user" or wall-clock state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Actor,
    pub now: Timestamp,
}

impl RequestContext {
    pub fn new(actor: Actor, now: Timestamp) -> Self {
        Self { actor, now }
    }

    /// Context stamped with the current UTC time.
    pub fn now(actor: Actor) -> Self {
        Self::new(actor, chrono::Utc::now())
    }

    pub fn today(&self) -> Date {
        self.now.date_naive()
    }

    pub fn year(&self) -> i32 {
        self.now.year()
    }
}
