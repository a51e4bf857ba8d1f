//! Approval effects as a pure plan.
//!
//! The plan is computed from the current asset rows and handed to the store,
//! which applies it only if every asset is still at the version it was
//! planned against.

use serde::Serialize;

use super::{Movement, MovementType, NewMovement, WorkflowError};
use crate::assets::{conditions, Asset, AssetCondition, LocatedAsset};
use crate::audit::{self, actions, NewAuditRecord};
use crate::types::{DbId, Timestamp};

/// The mutable slice of an asset a movement can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetState {
    pub room_id: Option<DbId>,
    pub custodian_id: Option<DbId>,
    pub condition: AssetCondition,
}

impl AssetState {
    pub fn of(asset: &Asset) -> Self {
        Self {
            room_id: asset.room_id,
            custodian_id: asset.custodian_id,
            condition: asset.condition,
        }
    }
}

/// One versioned asset update with its audit record.
#[derive(Debug, Clone)]
pub struct AssetChange {
    pub asset_id: DbId,
    pub internal_code: String,
    pub expected_version: i64,
    pub after: AssetState,
    pub audit: NewAuditRecord,
}

/// The movement fields that drive its effects.
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    pub movement_type: MovementType,
    pub destination_room_id: Option<DbId>,
    pub destination_custodian_id: Option<DbId>,
    pub new_condition: Option<AssetCondition>,
}

impl From<&Movement> for Effect {
    fn from(m: &Movement) -> Self {
        Self {
            movement_type: m.movement_type,
            destination_room_id: m.destination_room_id,
            destination_custodian_id: m.destination_custodian_id,
            new_condition: m.new_condition,
        }
    }
}

impl From<&NewMovement> for Effect {
    fn from(m: &NewMovement) -> Self {
        Self {
            movement_type: m.movement_type,
            destination_room_id: m.destination_room_id,
            destination_custodian_id: m.destination_custodian_id,
            new_condition: m.new_condition,
        }
    }
}

impl Effect {
    /// State of a target asset after approval.
    pub fn apply_to_target(&self, target: &LocatedAsset) -> AssetState {
        let mut state = AssetState::of(&target.asset);
        match self.movement_type {
            MovementType::Transfer => {
                state.room_id = self.destination_room_id.or(state.room_id);
            }
            MovementType::Assignment | MovementType::Loan => {
                state.custodian_id = self.destination_custodian_id;
                if target.is_mobile {
                    state.room_id = None;
                } else if let Some(room_id) = self.destination_room_id {
                    state.room_id = Some(room_id);
                }
            }
            MovementType::ConditionChange => {
                if let Some(condition) = self.new_condition {
                    state.condition = condition;
                }
            }
            MovementType::Maintenance
            | MovementType::Warranty
            | MovementType::Replacement
            | MovementType::Leasing => {
                state.condition = AssetCondition::InProcess;
            }
        }
        state
    }

    /// State of the replacement asset after approval: it takes the slot the
    /// first target occupies at approval time, not the origin recorded when
    /// the movement was created.
    pub fn apply_to_replacement(&self, first_target: &Asset) -> AssetState {
        AssetState {
            room_id: first_target.room_id,
            custodian_id: first_target.custodian_id,
            condition: AssetCondition::Active,
        }
    }
}

/// Planned end state for every asset the movement touches, in target order
/// with the replacement last.
pub fn plan_states<'a>(
    effect: &Effect,
    targets: &'a [LocatedAsset],
    replacement: Option<&'a LocatedAsset>,
) -> Result<Vec<(&'a LocatedAsset, AssetState)>, WorkflowError> {
    let decommissioned: Vec<String> = targets
        .iter()
        .chain(replacement)
        .filter(|a| conditions::is_terminal(a.asset.condition))
        .map(|a| a.asset.internal_code.clone())
        .collect();
    if !decommissioned.is_empty() {
        return Err(WorkflowError::AssetDecommissioned(decommissioned));
    }

    let mut planned: Vec<(&LocatedAsset, AssetState)> = targets
        .iter()
        .map(|t| (t, effect.apply_to_target(t)))
        .collect();
    if let (Some(replacement), Some(first)) = (replacement, targets.first()) {
        planned.push((replacement, effect.apply_to_replacement(&first.asset)));
    }

    let unanchored: Vec<String> = planned
        .iter()
        .filter(|(asset, state)| {
            !conditions::satisfies_anchor(
                state.condition,
                state.room_id,
                state.custodian_id,
                asset.is_mobile,
            )
        })
        .map(|(asset, _)| asset.asset.internal_code.clone())
        .collect();
    if !unanchored.is_empty() {
        return Err(WorkflowError::AnchorInvariantViolated(unanchored));
    }

    Ok(planned)
}

/// Build the versioned changes and audit records for approving `movement`.
pub fn plan_approval(
    movement: &Movement,
    targets: &[LocatedAsset],
    replacement: Option<&LocatedAsset>,
    actor_id: DbId,
    now: Timestamp,
) -> Result<Vec<AssetChange>, WorkflowError> {
    let effect = Effect::from(movement);
    let planned = plan_states(&effect, targets, replacement)?;

    Ok(planned
        .into_iter()
        .map(|(located, after)| {
            let before = AssetState::of(&located.asset);
            let mut changes = Vec::new();
            audit::track(&mut changes, "room", before.room_id, after.room_id);
            audit::track(&mut changes, "custodian", before.custodian_id, after.custodian_id);
            audit::track(
                &mut changes,
                "condition",
                Some(before.condition),
                Some(after.condition),
            );

            let is_replacement = Some(located.asset.id) == movement.replacement_asset_id;
            let action = if is_replacement {
                actions::REPLACEMENT_APPLIED
            } else {
                actions::MOVEMENT_APPLIED
            };

            AssetChange {
                asset_id: located.asset.id,
                internal_code: located.asset.internal_code.clone(),
                expected_version: located.asset.version,
                after,
                audit: NewAuditRecord {
                    movement_id: Some(movement.id),
                    action: action.to_string(),
                    actor_id,
                    changes,
                    recorded_at: now,
                },
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::movement::MovementStatus;

    fn located(id: DbId, room: Option<DbId>, custodian: Option<DbId>, mobile: bool) -> LocatedAsset {
        LocatedAsset {
            asset: Asset {
                id,
                internal_code: format!("SIS-2026-{id:04}"),
                label: "PENDING".into(),
                serial_number: None,
                name: "Laptop".into(),
                area_id: 1,
                asset_type_id: 1,
                room_id: room,
                condition: AssetCondition::Active,
                custodian_id: custodian,
                warranty_until: None,
                is_leasing: false,
                leasing_company: None,
                leasing_end: None,
                created_at: chrono::Utc::now(),
                created_by: 1,
                version: 3,
            },
            campus_id: room.map(|_| 1),
            is_mobile: mobile,
        }
    }

    fn movement(movement_type: MovementType) -> Movement {
        Movement {
            id: 50,
            movement_type,
            asset_ids: vec![1],
            origin_room_id: Some(10),
            destination_room_id: None,
            destination_custodian_id: None,
            new_condition: None,
            replacement_asset_id: None,
            expected_return: None,
            requester_id: 1,
            authorizer_id: 2,
            resolver_id: None,
            status: MovementStatus::Pending,
            reason: String::new(),
            rejection_reason: None,
            evidence_note: None,
            evidence_photo: None,
            created_at: chrono::Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn transfer_moves_room_only() {
        let mut m = movement(MovementType::Transfer);
        m.destination_room_id = Some(20);
        let target = located(1, Some(10), Some(7), false);

        let state = Effect::from(&m).apply_to_target(&target);
        assert_eq!(state.room_id, Some(20));
        assert_eq!(state.custodian_id, Some(7));
    }

    #[test]
    fn assignment_clears_room_for_mobile_assets() {
        let mut m = movement(MovementType::Assignment);
        m.destination_custodian_id = Some(8);
        let effect = Effect::from(&m);

        let mobile = effect.apply_to_target(&located(1, Some(10), None, true));
        assert_eq!(mobile.room_id, None);
        assert_eq!(mobile.custodian_id, Some(8));

        let fixed = effect.apply_to_target(&located(2, Some(10), None, false));
        assert_eq!(fixed.room_id, Some(10));
    }

    #[test]
    fn maintenance_sends_to_in_process_and_replacement_fills_slot() {
        let mut m = movement(MovementType::Maintenance);
        m.replacement_asset_id = Some(9);
        let targets = vec![located(1, Some(10), Some(7), false)];
        let replacement = located(9, None, None, false);

        let changes = plan_approval(&m, &targets, Some(&replacement), 2, chrono::Utc::now()).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].after.condition, AssetCondition::InProcess);
        assert_eq!(changes[0].expected_version, 3);
        assert_eq!(changes[0].audit.action, actions::MOVEMENT_APPLIED);

        let r = &changes[1];
        assert_eq!(r.asset_id, 9);
        assert_eq!(r.after.room_id, Some(10));
        assert_eq!(r.after.custodian_id, Some(7));
        assert_eq!(r.after.condition, AssetCondition::Active);
        assert_eq!(r.audit.action, actions::REPLACEMENT_APPLIED);
    }

    #[test]
    fn replacement_follows_the_target_not_the_recorded_origin() {
        let mut m = movement(MovementType::Maintenance);
        m.replacement_asset_id = Some(9);
        // Recorded origin is room 10; the target has since moved to 20.
        let targets = vec![located(1, Some(20), Some(7), false)];
        let replacement = located(9, None, None, false);

        let changes = plan_approval(&m, &targets, Some(&replacement), 2, chrono::Utc::now()).unwrap();
        assert_eq!(changes[1].after.room_id, Some(20));
    }

    #[test]
    fn condition_change_to_active_needs_anchor() {
        let mut m = movement(MovementType::ConditionChange);
        m.new_condition = Some(AssetCondition::Active);
        let mut target = located(1, None, None, false);
        target.asset.condition = AssetCondition::InStorage;

        let result = plan_approval(&m, &[target], None, 2, chrono::Utc::now());
        assert_matches!(result, Err(WorkflowError::AnchorInvariantViolated(ref codes)) if codes == &["SIS-2026-0001"]);
    }

    #[test]
    fn decommissioned_targets_cannot_be_planned() {
        let mut target = located(1, Some(10), None, false);
        target.asset.condition = AssetCondition::Decommissioned;
        let result = plan_approval(&movement(MovementType::Maintenance), &[target], None, 2, chrono::Utc::now());
        assert_matches!(result, Err(WorkflowError::AssetDecommissioned(_)));
    }

    #[test]
    fn audit_records_only_changed_fields() {
        let mut m = movement(MovementType::Transfer);
        m.destination_room_id = Some(20);
        let changes = plan_approval(&m, &[located(1, Some(10), Some(7), false)], None, 2, chrono::Utc::now()).unwrap();

        let fields: Vec<&str> = changes[0].audit.changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["room"]);
        assert_eq!(changes[0].audit.movement_id, Some(50));
    }
}
