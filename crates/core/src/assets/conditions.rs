//! Condition rules: which conditions callers may pick, the terminal
//! condition, and the room-or-custodian anchor invariant.

use super::AssetCondition;
use crate::types::DbId;

/// `decommissioned` is terminal; nothing moves an asset out of it.
pub fn is_terminal(condition: AssetCondition) -> bool {
    condition == AssetCondition::Decommissioned
}

/// Conditions a caller may request explicitly. `in_process` is set only by
/// maintenance-like movements.
pub fn is_selectable(condition: AssetCondition) -> bool {
    condition != AssetCondition::InProcess
}

/// Conditions accepted when registering a new asset.
pub fn is_initial(condition: AssetCondition) -> bool {
    is_selectable(condition) && !is_terminal(condition)
}

/// An `active` asset must sit in a room or with a custodian unless its type
/// is mobile.
pub fn satisfies_anchor(
    condition: AssetCondition,
    room_id: Option<DbId>,
    custodian_id: Option<DbId>,
    is_mobile: bool,
) -> bool {
    condition != AssetCondition::Active || room_id.is_some() || custodian_id.is_some() || is_mobile
}
