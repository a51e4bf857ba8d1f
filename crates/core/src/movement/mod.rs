//! Movement workflow: a request to change an asset's location, custody, or
//! condition, resolved once by an authorizer.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED
//!    └─────reject───▶ REJECTED
//! ```
//!
//! Both resolved states are terminal.

pub mod effects;
pub mod validation;
pub mod workflow;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assets::AssetCondition;
use crate::error::{CoreError, ErrorKind};
use crate::notification::NewNotification;
use crate::roles::Role;
use crate::store::StoreError;
use crate::types::{Date, DbId, Timestamp};

pub use effects::{AssetChange, AssetState};
pub use workflow::MovementWorkflow;

/// Maximum number of offending asset codes named in an error message.
pub const MAX_LISTED_CODES: usize = 3;

// ---------------------------------------------------------------------------
// Type and status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Transfer,
    Assignment,
    Loan,
    ConditionChange,
    Maintenance,
    Warranty,
    Replacement,
    Leasing,
}

impl MovementType {
    pub const ALL: [MovementType; 8] = [
        MovementType::Transfer,
        MovementType::Assignment,
        MovementType::Loan,
        MovementType::ConditionChange,
        MovementType::Maintenance,
        MovementType::Warranty,
        MovementType::Replacement,
        MovementType::Leasing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Transfer => "transfer",
            MovementType::Assignment => "assignment",
            MovementType::Loan => "loan",
            MovementType::ConditionChange => "condition_change",
            MovementType::Maintenance => "maintenance",
            MovementType::Warranty => "warranty",
            MovementType::Replacement => "replacement",
            MovementType::Leasing => "leasing",
        }
    }

    /// Types that send the asset out for service and may name a replacement.
    pub fn is_service(self) -> bool {
        matches!(
            self,
            MovementType::Maintenance
                | MovementType::Warranty
                | MovementType::Replacement
                | MovementType::Leasing
        )
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown movement type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pending,
    Approved,
    Rejected,
}

impl MovementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Approved => "approved",
            MovementStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != MovementStatus::Pending
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MovementStatus::Pending),
            "approved" => Ok(MovementStatus::Approved),
            "rejected" => Ok(MovementStatus::Rejected),
            other => Err(format!("Unknown movement status '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: DbId,
    pub movement_type: MovementType,
    pub asset_ids: Vec<DbId>,
    /// Room of the first target when the request was made.
    pub origin_room_id: Option<DbId>,
    pub destination_room_id: Option<DbId>,
    pub destination_custodian_id: Option<DbId>,
    pub new_condition: Option<AssetCondition>,
    pub replacement_asset_id: Option<DbId>,
    pub expected_return: Option<Date>,
    pub requester_id: DbId,
    pub authorizer_id: DbId,
    pub resolver_id: Option<DbId>,
    pub status: MovementStatus,
    pub reason: String,
    pub rejection_reason: Option<String>,
    pub evidence_note: Option<String>,
    pub evidence_photo: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// Caller input for creating a movement. Assets are named by internal code.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    #[serde(default)]
    pub asset_codes: Vec<String>,
    pub authorizer_id: DbId,
    pub destination_room_id: Option<DbId>,
    pub destination_custodian_id: Option<DbId>,
    pub new_condition: Option<AssetCondition>,
    pub replacement_asset_code: Option<String>,
    pub expected_return: Option<Date>,
    #[serde(default)]
    pub reason: String,
    pub evidence_note: Option<String>,
    pub evidence_photo: Option<String>,
}

/// Validated movement insert, always pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub asset_ids: Vec<DbId>,
    pub origin_room_id: Option<DbId>,
    pub destination_room_id: Option<DbId>,
    pub destination_custodian_id: Option<DbId>,
    pub new_condition: Option<AssetCondition>,
    pub replacement_asset_id: Option<DbId>,
    pub expected_return: Option<Date>,
    pub requester_id: DbId,
    pub authorizer_id: DbId,
    pub reason: String,
    pub evidence_note: Option<String>,
    pub evidence_photo: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub status: Option<MovementStatus>,
    pub requester_id: Option<DbId>,
    pub authorizer_id: Option<DbId>,
}

/// An actor a requester may name as authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizerCandidate {
    pub id: DbId,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

/// Everything a store needs to commit a resolution in one unit.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub movement_id: DbId,
    pub status: MovementStatus,
    pub resolver_id: DbId,
    pub resolved_at: Timestamp,
    pub rejection_reason: Option<String>,
    /// Empty for rejections.
    pub changes: Vec<AssetChange>,
    pub notification: NewNotification,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn list_codes(codes: &[String]) -> String {
    codes.join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("At least one asset must be selected")]
    NoAssetsSelected,

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{field} is required for a {movement_type} movement")]
    MissingField {
        movement_type: MovementType,
        field: &'static str,
    },

    #[error("Expected return date {0} is in the past")]
    ReturnDateInPast(Date),

    #[error("Condition {0} cannot be requested directly")]
    ConditionNotSelectable(AssetCondition),

    #[error("A {0} movement cannot name a replacement asset")]
    ReplacementNotAllowed(MovementType),

    #[error("Replacement asset {0} is also a target of the movement")]
    ReplacementIsTarget(String),

    #[error("Decommissioned assets cannot be moved: {}", list_codes(.0))]
    AssetDecommissioned(Vec<String>),

    #[error("Assets outside your permitted campuses: {}", list_codes(.0))]
    CampusNotPermitted(Vec<String>),

    #[error("{total} asset(s) outside your scope, e.g. {}", list_codes(.shown))]
    AssetNotInScope { shown: Vec<String>, total: usize },

    #[error("You cannot authorize your own movement")]
    SelfAuthorizationForbidden,

    #[error("Actor {0} cannot authorize this movement")]
    AuthorizerNotEligible(DbId),

    #[error("Collaborator {0} is inactive")]
    InactiveCustodian(DbId),

    #[error("Active assets would be left without room or custodian: {}", list_codes(.0))]
    AnchorInvariantViolated(Vec<String>),

    #[error("Only the named authorizer or an admin can resolve movement {0}")]
    NotAuthorizedToResolve(DbId),

    #[error("A rejection reason is required")]
    EmptyRejectionReason,

    #[error("Movement {movement_id} is already {status}")]
    AlreadyResolved {
        movement_id: DbId,
        status: MovementStatus,
    },

    #[error("Assets of movement {0} changed during approval, retry")]
    ConcurrentModification(DbId),

    #[error("Not permitted to view movement {0}")]
    NotVisible(DbId),

    #[error(transparent)]
    Store(StoreError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NoAssetsSelected
            | WorkflowError::MissingField { .. }
            | WorkflowError::ReturnDateInPast(_)
            | WorkflowError::ConditionNotSelectable(_)
            | WorkflowError::ReplacementNotAllowed(_)
            | WorkflowError::ReplacementIsTarget(_)
            | WorkflowError::AssetDecommissioned(_)
            | WorkflowError::InactiveCustodian(_)
            | WorkflowError::AnchorInvariantViolated(_)
            | WorkflowError::EmptyRejectionReason => ErrorKind::Validation,
            WorkflowError::CampusNotPermitted(_)
            | WorkflowError::AssetNotInScope { .. }
            | WorkflowError::SelfAuthorizationForbidden
            | WorkflowError::AuthorizerNotEligible(_)
            | WorkflowError::NotAuthorizedToResolve(_)
            | WorkflowError::NotVisible(_) => ErrorKind::Authorization,
            WorkflowError::AlreadyResolved { .. } | WorkflowError::ConcurrentModification(_) => {
                ErrorKind::Conflict
            }
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            WorkflowError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        WorkflowError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Build [`WorkflowError::AssetNotInScope`] naming at most
    /// [`MAX_LISTED_CODES`] codes.
    pub fn not_in_scope(mut codes: Vec<String>) -> Self {
        let total = codes.len();
        codes.truncate(MAX_LISTED_CODES);
        WorkflowError::AssetNotInScope {
            shown: codes,
            total,
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => WorkflowError::NotFound { entity, key },
            other => WorkflowError::Store(other),
        }
    }
}

impl From<WorkflowError> for CoreError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound { entity, key } => CoreError::NotFound { entity, key },
            other => CoreError::from_kind(other.kind(), other.to_string()),
        }
    }
}
