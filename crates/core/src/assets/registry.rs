//! Asset registration, labelling, and scoped reads.

use serde::Deserialize;

use super::codes::{self, PENDING_LABEL};
use super::conditions;
use super::similarity::{self, SimilarNameAdvice};
use super::{Asset, AssetCondition, AssetError, LocatedAsset, NewAsset};
use crate::audit::{actions, AuditRecord, FieldChange, NewAuditRecord};
use crate::context::RequestContext;
use crate::events::{event_types, EventKind, EventSink, WorkflowEvent};
use crate::scope::{self, ScopeDescriptor};
use crate::store::{constraints, AssetFilter, InventoryStore, StoreError};
use crate::types::{Date, DbId};

/// Label writes that lose a version race are retried this many times in total.
const MAX_LABEL_ATTEMPTS: usize = 2;

/// Caller input for [`register_asset`].
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRegistration {
    pub name: String,
    pub area_id: DbId,
    pub asset_type_id: DbId,
    pub serial_number: Option<String>,
    pub label: Option<String>,
    pub room_id: Option<DbId>,
    pub custodian_id: Option<DbId>,
    pub condition: Option<AssetCondition>,
    pub warranty_until: Option<Date>,
    #[serde(default)]
    pub is_leasing: bool,
    pub leasing_company: Option<String>,
    pub leasing_end: Option<Date>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn map_unique(err: StoreError, serial: Option<&str>, label: &str) -> AssetError {
    match err {
        StoreError::UniqueViolation { ref constraint } if constraint == constraints::ASSET_SERIAL => {
            AssetError::DuplicateSerial(serial.unwrap_or_default().to_string())
        }
        StoreError::UniqueViolation { ref constraint } if constraint == constraints::ASSET_LABEL => {
            AssetError::DuplicateLabel(label.to_string())
        }
        other => other.into(),
    }
}

/// Register a new asset.
///
/// Allocates the internal code from the area prefix and the current year and
/// writes the asset together with one creation audit record.
pub async fn register_asset<S>(
    store: &S,
    sink: &dyn EventSink,
    ctx: &RequestContext,
    input: &AssetRegistration,
) -> Result<Asset, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AssetError::EmptyName);
    }

    let area = store
        .get_area(input.area_id)
        .await?
        .ok_or_else(|| AssetError::not_found("Area", input.area_id))?;
    if !area.is_active {
        return Err(AssetError::InactiveArea(area.id));
    }
    let asset_type = store
        .get_asset_type(input.asset_type_id)
        .await?
        .ok_or_else(|| AssetError::not_found("AssetType", input.asset_type_id))?;
    if asset_type.area_id != area.id {
        return Err(AssetError::TypeAreaMismatch {
            asset_type_id: asset_type.id,
            area_id: area.id,
        });
    }

    let campus_id = match input.room_id {
        Some(room_id) => {
            if store.get_room(room_id).await?.is_none() {
                return Err(AssetError::not_found("Room", room_id));
            }
            store.room_campus(room_id).await?
        }
        None => None,
    };

    let scope = scope::resolve(&ctx.actor);
    if !scope.covers(area.id, campus_id) {
        tracing::warn!(actor_id = ctx.actor.id, area_id = area.id, "Asset registration denied");
        return Err(AssetError::OutOfScope { area_id: area.id });
    }

    if let Some(custodian_id) = input.custodian_id {
        let custodian = store
            .get_collaborator(custodian_id)
            .await?
            .ok_or_else(|| AssetError::not_found("Collaborator", custodian_id))?;
        if !custodian.is_active {
            return Err(AssetError::InactiveCustodian(custodian_id));
        }
    }

    let condition = input.condition.unwrap_or(AssetCondition::InStorage);
    if !conditions::is_initial(condition) {
        return Err(AssetError::ConditionNotSelectable(condition));
    }
    if !conditions::satisfies_anchor(
        condition,
        input.room_id,
        input.custodian_id,
        asset_type.is_mobile,
    ) {
        return Err(AssetError::AnchorInvariantViolated);
    }

    let serial_number = trimmed(input.serial_number.as_deref());
    if let Some(serial) = serial_number.as_deref() {
        if store.serial_exists(serial).await? {
            return Err(AssetError::DuplicateSerial(serial.to_string()));
        }
    }

    let label = codes::normalize_label(input.label.as_deref());
    if label != PENDING_LABEL {
        if !codes::is_valid_label(&label) {
            return Err(AssetError::InvalidLabel(label));
        }
        if store.label_exists(&label, None).await? {
            return Err(AssetError::DuplicateLabel(label));
        }
    }

    let internal_code =
        codes::allocate_internal_code(store, codes::area_prefix(&area.code), ctx.year()).await?;

    let new_asset = NewAsset {
        internal_code: internal_code.clone(),
        label: label.clone(),
        serial_number: serial_number.clone(),
        name: name.to_string(),
        area_id: area.id,
        asset_type_id: asset_type.id,
        room_id: input.room_id,
        condition,
        custodian_id: input.custodian_id,
        warranty_until: input.warranty_until,
        is_leasing: input.is_leasing,
        leasing_company: trimmed(input.leasing_company.as_deref()),
        leasing_end: input.leasing_end,
        created_at: ctx.now,
        created_by: ctx.actor.id,
    };

    let mut changes = vec![
        FieldChange::new("internal_code", None, Some(internal_code.clone())),
        FieldChange::new("condition", None, Some(condition.to_string())),
    ];
    if let Some(room_id) = input.room_id {
        changes.push(FieldChange::new("room", None, Some(room_id.to_string())));
    }
    if let Some(custodian_id) = input.custodian_id {
        changes.push(FieldChange::new("custodian", None, Some(custodian_id.to_string())));
    }
    let audit = NewAuditRecord {
        movement_id: None,
        action: actions::ASSET_CREATED.to_string(),
        actor_id: ctx.actor.id,
        changes,
        recorded_at: ctx.now,
    };

    let asset = store
        .insert_asset(&new_asset, &audit)
        .await
        .map_err(|e| map_unique(e, serial_number.as_deref(), &label))?;

    tracing::info!(
        asset_id = asset.id,
        internal_code = %asset.internal_code,
        actor_id = ctx.actor.id,
        "Asset registered"
    );
    sink.emit(
        WorkflowEvent::new(EventKind::Audit, event_types::ASSET_REGISTERED, ctx.now)
            .with_actor(ctx.actor.id)
            .with_subject("asset", asset.id)
            .with_payload(serde_json::json!({
                "internal_code": asset.internal_code,
                "area_id": asset.area_id,
            })),
    );

    Ok(asset)
}

/// Load an asset by internal code and require write scope over it.
async fn load_writable<S>(
    store: &S,
    scope: &ScopeDescriptor,
    internal_code: &str,
) -> Result<LocatedAsset, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let located = load_located(store, internal_code).await?;
    if !scope::can_act_on(scope, &located) {
        return Err(AssetError::OutOfScope {
            area_id: located.asset.area_id,
        });
    }
    Ok(located)
}

async fn load_located<S>(store: &S, internal_code: &str) -> Result<LocatedAsset, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let code = internal_code.trim().to_ascii_uppercase();
    store
        .locate_asset_by_code(&code)
        .await?
        .ok_or_else(|| AssetError::not_found("Asset", code))
}

/// Replace an asset's physical label (typically `PENDING` to a real tag).
///
/// A version conflict reloads the asset and retries once before surfacing as
/// [`AssetError::ConcurrentModification`].
pub async fn assign_label<S>(
    store: &S,
    sink: &dyn EventSink,
    ctx: &RequestContext,
    internal_code: &str,
    raw_label: &str,
) -> Result<Asset, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let label = codes::normalize_label(Some(raw_label));
    if !codes::is_valid_label(&label) {
        return Err(AssetError::InvalidLabel(raw_label.trim().to_string()));
    }
    let scope = scope::resolve(&ctx.actor);

    let mut attempt = 0;
    let updated = loop {
        attempt += 1;
        let asset = load_writable(store, &scope, internal_code).await?.asset;
        if conditions::is_terminal(asset.condition) {
            return Err(AssetError::Decommissioned(asset.internal_code));
        }
        if label == asset.label {
            return Ok(asset);
        }
        if store.label_exists(&label, Some(asset.id)).await? {
            return Err(AssetError::DuplicateLabel(label));
        }

        let audit = NewAuditRecord {
            movement_id: None,
            action: actions::LABEL_ASSIGNED.to_string(),
            actor_id: ctx.actor.id,
            changes: vec![FieldChange::new(
                "label",
                Some(asset.label.clone()),
                Some(label.clone()),
            )],
            recorded_at: ctx.now,
        };

        match store
            .update_label(asset.id, asset.version, &label, &audit)
            .await
        {
            Ok(updated) => break updated,
            Err(StoreError::Contention { .. }) if attempt < MAX_LABEL_ATTEMPTS => {
                tracing::warn!(asset_id = asset.id, attempt, "Label update hit a concurrent write");
            }
            Err(StoreError::Contention { .. }) => {
                return Err(AssetError::ConcurrentModification(asset.internal_code))
            }
            Err(e) => return Err(map_unique(e, None, &label)),
        }
    };

    tracing::info!(asset_id = updated.id, label = %updated.label, "Asset label assigned");
    sink.emit(
        WorkflowEvent::new(EventKind::Audit, event_types::ASSET_LABEL_ASSIGNED, ctx.now)
            .with_actor(ctx.actor.id)
            .with_subject("asset", updated.id)
            .with_payload(serde_json::json!({ "label": updated.label })),
    );
    Ok(updated)
}

/// Fetch one asset the caller may view.
pub async fn get_asset<S>(
    store: &S,
    ctx: &RequestContext,
    internal_code: &str,
) -> Result<LocatedAsset, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let located = load_located(store, internal_code).await?;
    let scope = scope::resolve(&ctx.actor);
    if !scope::can_view(&scope, &located) {
        return Err(AssetError::OutOfScope {
            area_id: located.asset.area_id,
        });
    }
    Ok(located)
}

/// All assets the caller may view, optionally narrowed by `filter`.
pub async fn list_assets<S>(
    store: &S,
    ctx: &RequestContext,
    filter: &AssetFilter,
) -> Result<Vec<LocatedAsset>, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let scope = scope::resolve(&ctx.actor);
    let assets = store.list_assets(filter).await?;
    Ok(scope::filter_visible(&scope, assets))
}

/// Audit history for an asset the caller may view, newest first.
pub async fn asset_history<S>(
    store: &S,
    ctx: &RequestContext,
    internal_code: &str,
) -> Result<Vec<AuditRecord>, AssetError>
where
    S: InventoryStore + ?Sized,
{
    let located = get_asset(store, ctx, internal_code).await?;
    Ok(store.list_audit_records(located.asset.id).await?)
}

/// Advisory check before creating an asset type named `name` in `area_id`.
pub async fn similar_type_names<S>(
    store: &S,
    area_id: DbId,
    name: &str,
) -> Result<SimilarNameAdvice, AssetError>
where
    S: InventoryStore + ?Sized,
{
    if store.get_area(area_id).await?.is_none() {
        return Err(AssetError::not_found("Area", area_id));
    }
    let existing = store.list_asset_types(area_id).await?;
    Ok(similarity::similar_type_names(name, &existing))
}
