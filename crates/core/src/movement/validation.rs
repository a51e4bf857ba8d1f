//! Request-shape checks that need no store access.

use super::{MovementRequest, MovementType, WorkflowError};
use crate::assets::conditions;
use crate::types::Date;

/// Trim, uppercase, and de-duplicate the requested asset codes, keeping order.
pub fn normalize_codes(codes: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim().to_ascii_uppercase();
        if !code.is_empty() && !seen.contains(&code) {
            seen.push(code);
        }
    }
    seen
}

/// Validate the fields each movement type requires.
pub fn validate_shape(request: &MovementRequest, today: Date) -> Result<(), WorkflowError> {
    let movement_type = request.movement_type;
    let missing = |field| WorkflowError::MissingField {
        movement_type,
        field,
    };

    match movement_type {
        MovementType::Transfer => {
            if request.destination_room_id.is_none() {
                return Err(missing("destination_room_id"));
            }
        }
        MovementType::Assignment => {
            if request.destination_custodian_id.is_none() {
                return Err(missing("destination_custodian_id"));
            }
        }
        MovementType::Loan => {
            if request.destination_custodian_id.is_none() {
                return Err(missing("destination_custodian_id"));
            }
            let expected = request
                .expected_return
                .ok_or_else(|| missing("expected_return"))?;
            if expected < today {
                return Err(WorkflowError::ReturnDateInPast(expected));
            }
        }
        MovementType::ConditionChange => {
            let condition = request.new_condition.ok_or_else(|| missing("new_condition"))?;
            if !conditions::is_selectable(condition) {
                return Err(WorkflowError::ConditionNotSelectable(condition));
            }
        }
        MovementType::Maintenance
        | MovementType::Warranty
        | MovementType::Replacement
        | MovementType::Leasing => {}
    }

    let has_replacement = request
        .replacement_asset_code
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if has_replacement && !movement_type.is_service() {
        return Err(WorkflowError::ReplacementNotAllowed(movement_type));
    }

    Ok(())
}
