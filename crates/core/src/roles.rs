//! Well-known role names.
//!
//! These must match the `CHECK` constraint on `actor_profiles.role`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_AUXILIARY: &str = "auxiliary";
pub const ROLE_EXTERNAL: &str = "external";

/// Legacy spelling of the auxiliary role still present in imported profiles.
const ROLE_OPERATOR_ALIAS: &str = "operator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    Auxiliary,
    External,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Supervisor => ROLE_SUPERVISOR,
            Role::Auxiliary => ROLE_AUXILIARY,
            Role::External => ROLE_EXTERNAL,
        }
    }

    /// Roles that may be named as the authorizer of a movement.
    pub fn can_authorize(self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_SUPERVISOR => Ok(Role::Supervisor),
            ROLE_AUXILIARY | ROLE_OPERATOR_ALIAS => Ok(Role::Auxiliary),
            ROLE_EXTERNAL => Ok(Role::External),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}
