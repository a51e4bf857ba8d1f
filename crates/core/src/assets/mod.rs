//! Asset registry domain: entities, internal code allocation, registration,
//! condition rules, and the similar-name advisory.
//!
//! Nothing here touches the database directly; callers hand in a store that
//! implements the traits in [`crate::store`].

pub mod codes;
pub mod conditions;
pub mod registry;
pub mod similarity;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorKind};
use crate::store::StoreError;
use crate::types::{Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCondition {
    New,
    Good,
    Fair,
    Damaged,
    InStorage,
    InCustody,
    Active,
    /// Reserved for maintenance-like movements; never chosen directly.
    InProcess,
    /// Terminal.
    Decommissioned,
}

impl AssetCondition {
    pub const ALL: [AssetCondition; 9] = [
        AssetCondition::New,
        AssetCondition::Good,
        AssetCondition::Fair,
        AssetCondition::Damaged,
        AssetCondition::InStorage,
        AssetCondition::InCustody,
        AssetCondition::Active,
        AssetCondition::InProcess,
        AssetCondition::Decommissioned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetCondition::New => "new",
            AssetCondition::Good => "good",
            AssetCondition::Fair => "fair",
            AssetCondition::Damaged => "damaged",
            AssetCondition::InStorage => "in_storage",
            AssetCondition::InCustody => "in_custody",
            AssetCondition::Active => "active",
            AssetCondition::InProcess => "in_process",
            AssetCondition::Decommissioned => "decommissioned",
        }
    }
}

impl fmt::Display for AssetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetCondition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown asset condition '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: DbId,
    /// Stable key such as `sistemas` or `laboratorio`; drives the code prefix.
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetType {
    pub id: DbId,
    pub area_id: DbId,
    pub name: String,
    /// Mobile assets follow their custodian and may have no room.
    pub is_mobile: bool,
}

/// A person who can hold custody of assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: DbId,
    pub full_name: String,
    pub unit: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: DbId,
    /// `<PREFIX>-<YEAR>-<SEQ4>`, immutable.
    pub internal_code: String,
    /// Physical label, `PENDING` until one is affixed.
    pub label: String,
    pub serial_number: Option<String>,
    pub name: String,
    pub area_id: DbId,
    pub asset_type_id: DbId,
    pub room_id: Option<DbId>,
    pub condition: AssetCondition,
    pub custodian_id: Option<DbId>,
    pub warranty_until: Option<Date>,
    pub is_leasing: bool,
    pub leasing_company: Option<String>,
    pub leasing_end: Option<Date>,
    pub created_at: Timestamp,
    pub created_by: DbId,
    /// Bumped on every mutation; guards concurrent updates.
    pub version: i64,
}

impl Asset {
    pub fn label_pending(&self) -> bool {
        self.label == codes::PENDING_LABEL
    }

    pub fn in_warranty(&self, today: Date) -> bool {
        self.warranty_until.is_some_and(|until| until >= today)
    }

    pub fn leasing_active(&self, today: Date) -> bool {
        self.is_leasing && self.leasing_end.map_or(true, |end| end >= today)
    }
}

/// An asset together with the facts scope checks need: the campus of its
/// current room and whether its type is mobile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub campus_id: Option<DbId>,
    pub is_mobile: bool,
}

/// Validated asset insert; produced by [`registry::register_asset`].
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub internal_code: String,
    pub label: String,
    pub serial_number: Option<String>,
    pub name: String,
    pub area_id: DbId,
    pub asset_type_id: DbId,
    pub room_id: Option<DbId>,
    pub condition: AssetCondition,
    pub custodian_id: Option<DbId>,
    pub warranty_until: Option<Date>,
    pub is_leasing: bool,
    pub leasing_company: Option<String>,
    pub leasing_end: Option<Date>,
    pub created_at: Timestamp,
    pub created_by: DbId,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Asset name must not be empty")]
    EmptyName,

    #[error("Area {0} is inactive")]
    InactiveArea(DbId),

    #[error("Asset type {asset_type_id} does not belong to area {area_id}")]
    TypeAreaMismatch { asset_type_id: DbId, area_id: DbId },

    #[error("Serial number {0} is already registered")]
    DuplicateSerial(String),

    #[error("Label {0} is already assigned to another asset")]
    DuplicateLabel(String),

    #[error("Invalid label '{0}'")]
    InvalidLabel(String),

    #[error("Condition {0} cannot be chosen here")]
    ConditionNotSelectable(AssetCondition),

    #[error("Collaborator {0} is inactive")]
    InactiveCustodian(DbId),

    #[error("An active asset needs a room or a custodian unless its type is mobile")]
    AnchorInvariantViolated,

    #[error("Asset {0} is decommissioned")]
    Decommissioned(String),

    #[error("Not permitted to act on assets of area {area_id}")]
    OutOfScope { area_id: DbId },

    #[error("Asset {0} was modified concurrently, retry")]
    ConcurrentModification(String),

    #[error(transparent)]
    Store(StoreError),
}

impl AssetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::NotFound { .. } => ErrorKind::NotFound,
            AssetError::EmptyName
            | AssetError::InactiveArea(_)
            | AssetError::TypeAreaMismatch { .. }
            | AssetError::InvalidLabel(_)
            | AssetError::ConditionNotSelectable(_)
            | AssetError::InactiveCustodian(_)
            | AssetError::AnchorInvariantViolated
            | AssetError::Decommissioned(_) => ErrorKind::Validation,
            AssetError::DuplicateSerial(_)
            | AssetError::DuplicateLabel(_)
            | AssetError::ConcurrentModification(_) => ErrorKind::Conflict,
            AssetError::OutOfScope { .. } => ErrorKind::Authorization,
            AssetError::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            AssetError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        AssetError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<StoreError> for AssetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => AssetError::NotFound { entity, key },
            other => AssetError::Store(other),
        }
    }
}

impl From<AssetError> for CoreError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound { entity, key } => CoreError::NotFound { entity, key },
            other => CoreError::from_kind(other.kind(), other.to_string()),
        }
    }
}
