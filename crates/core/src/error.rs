use std::fmt;

/// Coarse classification shared by every component error.
///
/// The HTTP layer maps these to status codes; the workflow uses them to decide
/// which failures count as denied attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid input the caller can correct.
    Validation,
    /// The actor is not allowed to perform the operation.
    Authorization,
    /// Uniqueness, immutability, or state-machine conflict.
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Build a core error from a component error's kind and message.
    ///
    /// `NotFound` is not reachable through this path because it needs the
    /// entity name; component conversions handle it explicitly.
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => CoreError::Validation(message),
            ErrorKind::Authorization => CoreError::Forbidden(message),
            ErrorKind::Conflict => CoreError::Conflict(message),
            ErrorKind::NotFound => CoreError::NotFound {
                entity: "Resource",
                key: message,
            },
            ErrorKind::Internal => CoreError::Internal(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Unauthorized(_) | CoreError::Forbidden(_) => ErrorKind::Authorization,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_includes_entity_and_key() {
        let err = CoreError::not_found("Asset", "SIS-2026-0001");
        assert_eq!(err.to_string(), "Entity not found: Asset SIS-2026-0001");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn authorization_kind_maps_to_forbidden() {
        let err = CoreError::from_kind(ErrorKind::Authorization, "nope".into());
        assert!(matches!(err, CoreError::Forbidden(ref m) if m == "nope"));
    }
}
