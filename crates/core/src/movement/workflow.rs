//! The movement workflow engine.
//!
//! [`MovementWorkflow`] validates and authorizes movement requests, persists
//! them as pending, and resolves them. Each write is a single store call so
//! the adapter commits it as one transaction; events go out only after the
//! store call returns.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::effects::{self, Effect};
use super::validation;
use super::{
    AuthorizerCandidate, Decision, Movement, MovementFilter, MovementRequest, MovementStatus,
    NewMovement, Resolution, WorkflowError,
};
use crate::assets::LocatedAsset;
use crate::context::RequestContext;
use crate::error::ErrorKind;
use crate::events::{event_types, EventKind, EventSink, WorkflowEvent};
use crate::notification;
use crate::roles::Role;
use crate::scope::{self, Actor, ScopeDescriptor};
use crate::store::{InventoryStore, StoreError};
use crate::types::DbId;

/// Attempts at applying an approval before giving up on version conflicts.
const MAX_APPLY_ATTEMPTS: usize = 2;

pub struct MovementWorkflow {
    store: Arc<dyn InventoryStore>,
    sink: Arc<dyn EventSink>,
}

impl MovementWorkflow {
    pub fn new(store: Arc<dyn InventoryStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Validate, authorize, and persist a pending movement.
    ///
    /// Nothing is written unless every check passes. Authorization failures
    /// are reported to the event sink as denied attempts.
    pub async fn create_movement(
        &self,
        ctx: &RequestContext,
        request: &MovementRequest,
    ) -> Result<Movement, WorkflowError> {
        let codes = validation::normalize_codes(&request.asset_codes);
        match self.prepare(ctx, request, &codes).await {
            Ok(new_movement) => self.persist(ctx, new_movement).await,
            Err(err) => {
                if err.kind() == ErrorKind::Authorization {
                    self.record_denied(ctx, &codes, &err);
                }
                Err(err)
            }
        }
    }

    async fn prepare(
        &self,
        ctx: &RequestContext,
        request: &MovementRequest,
        codes: &[String],
    ) -> Result<NewMovement, WorkflowError> {
        if codes.is_empty() {
            return Err(WorkflowError::NoAssetsSelected);
        }
        validation::validate_shape(request, ctx.today())?;

        let targets = self.load_by_codes(codes).await?;

        let decommissioned: Vec<String> = targets
            .iter()
            .filter(|t| crate::assets::conditions::is_terminal(t.asset.condition))
            .map(|t| t.asset.internal_code.clone())
            .collect();
        if !decommissioned.is_empty() {
            return Err(WorkflowError::AssetDecommissioned(decommissioned));
        }

        let scope = scope::resolve(&ctx.actor);
        check_campuses(&scope, &targets)?;
        check_in_scope(&scope, &targets)?;

        if request.authorizer_id == ctx.actor.id && !ctx.actor.is_admin() {
            return Err(WorkflowError::SelfAuthorizationForbidden);
        }
        let authorizer = self
            .store
            .get_actor(request.authorizer_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Actor", request.authorizer_id))?;
        if !authorizer_eligible(&authorizer, &targets) {
            return Err(WorkflowError::AuthorizerNotEligible(authorizer.id));
        }

        if let Some(room_id) = request.destination_room_id {
            if self.store.get_room(room_id).await?.is_none() {
                return Err(WorkflowError::not_found("Room", room_id));
            }
        }
        if let Some(custodian_id) = request.destination_custodian_id {
            let custodian = self
                .store
                .get_collaborator(custodian_id)
                .await?
                .ok_or_else(|| WorkflowError::not_found("Collaborator", custodian_id))?;
            if !custodian.is_active {
                return Err(WorkflowError::InactiveCustodian(custodian_id));
            }
        }

        let replacement = match request
            .replacement_asset_code
            .as_deref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(self.load_replacement(&scope, &targets, code).await?),
            None => None,
        };

        let new_movement = NewMovement {
            movement_type: request.movement_type,
            asset_ids: targets.iter().map(|t| t.asset.id).collect(),
            origin_room_id: targets.first().and_then(|t| t.asset.room_id),
            destination_room_id: request.destination_room_id,
            destination_custodian_id: request.destination_custodian_id,
            new_condition: request.new_condition,
            replacement_asset_id: replacement.as_ref().map(|r| r.asset.id),
            expected_return: request.expected_return,
            requester_id: ctx.actor.id,
            authorizer_id: authorizer.id,
            reason: request.reason.trim().to_string(),
            evidence_note: non_blank(request.evidence_note.as_deref()),
            evidence_photo: non_blank(request.evidence_photo.as_deref()),
            created_at: ctx.now,
        };

        // Reject now what approval would reject later.
        effects::plan_states(&Effect::from(&new_movement), &targets, replacement.as_ref())?;

        Ok(new_movement)
    }

    async fn load_replacement(
        &self,
        scope: &ScopeDescriptor,
        targets: &[LocatedAsset],
        code: String,
    ) -> Result<LocatedAsset, WorkflowError> {
        if targets.iter().any(|t| t.asset.internal_code == code) {
            return Err(WorkflowError::ReplacementIsTarget(code));
        }
        let replacement = self
            .store
            .locate_asset_by_code(&code)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Asset", &code))?;
        if crate::assets::conditions::is_terminal(replacement.asset.condition) {
            return Err(WorkflowError::AssetDecommissioned(vec![code]));
        }
        if !scope::can_act_on(scope, &replacement) {
            return Err(WorkflowError::not_in_scope(vec![code]));
        }
        Ok(replacement)
    }

    async fn persist(
        &self,
        ctx: &RequestContext,
        new_movement: NewMovement,
    ) -> Result<Movement, WorkflowError> {
        let note = notification::movement_created(
            new_movement.authorizer_id,
            &ctx.actor.display_name,
            new_movement.movement_type.as_str(),
            new_movement.asset_ids.len(),
            ctx.now,
        );
        let movement = self.store.insert_movement(&new_movement, &note).await?;

        tracing::info!(
            movement_id = movement.id,
            movement_type = %movement.movement_type,
            requester_id = movement.requester_id,
            authorizer_id = movement.authorizer_id,
            asset_count = movement.asset_ids.len(),
            "Movement created"
        );
        self.sink.emit(
            WorkflowEvent::new(EventKind::Notification, event_types::MOVEMENT_CREATED, ctx.now)
                .with_actor(ctx.actor.id)
                .with_subject("movement", movement.id)
                .with_payload(serde_json::json!({
                    "movement_type": movement.movement_type,
                    "asset_ids": movement.asset_ids,
                    "recipient_id": movement.authorizer_id,
                })),
        );
        Ok(movement)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Approve or reject a pending movement.
    ///
    /// Approval applies every asset change, its audit records, and the
    /// requester notification in one store call. A version conflict is
    /// retried once with a fresh plan before surfacing as
    /// [`WorkflowError::ConcurrentModification`].
    pub async fn resolve_movement(
        &self,
        ctx: &RequestContext,
        movement_id: DbId,
        decision: Decision,
    ) -> Result<Movement, WorkflowError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let movement = self.load_movement(movement_id).await?;
            if movement.status.is_terminal() {
                return Err(WorkflowError::AlreadyResolved {
                    movement_id,
                    status: movement.status,
                });
            }
            if movement.authorizer_id != ctx.actor.id && !ctx.actor.is_admin() {
                let err = WorkflowError::NotAuthorizedToResolve(movement_id);
                self.record_denied(ctx, &[], &err);
                return Err(err);
            }

            let resolution = match &decision {
                Decision::Approve => self.plan_approval(ctx, &movement).await?,
                Decision::Reject { reason } => plan_rejection(ctx, &movement, reason)?,
            };

            match self.store.apply_resolution(&resolution).await {
                Ok(resolved) => {
                    self.announce_resolution(ctx, &resolved, resolution.changes.len());
                    return Ok(resolved);
                }
                Err(StoreError::StaleStatus(_)) => {
                    let current = self.load_movement(movement_id).await?;
                    return Err(WorkflowError::AlreadyResolved {
                        movement_id,
                        status: current.status,
                    });
                }
                Err(StoreError::Contention { entity, id }) => {
                    tracing::warn!(movement_id, entity, id, attempt, "Approval hit a concurrent update");
                    if attempt >= MAX_APPLY_ATTEMPTS {
                        return Err(WorkflowError::ConcurrentModification(movement_id));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn plan_approval(
        &self,
        ctx: &RequestContext,
        movement: &Movement,
    ) -> Result<Resolution, WorkflowError> {
        let targets = self.load_by_ids(&movement.asset_ids).await?;
        let replacement = match movement.replacement_asset_id {
            Some(id) => Some(
                self.store
                    .locate_asset(id)
                    .await?
                    .ok_or_else(|| WorkflowError::not_found("Asset", id))?,
            ),
            None => None,
        };

        let changes =
            effects::plan_approval(movement, &targets, replacement.as_ref(), ctx.actor.id, ctx.now)?;

        Ok(Resolution {
            movement_id: movement.id,
            status: MovementStatus::Approved,
            resolver_id: ctx.actor.id,
            resolved_at: ctx.now,
            rejection_reason: None,
            changes,
            notification: notification::movement_approved(movement, &ctx.actor.display_name, ctx.now),
        })
    }

    fn announce_resolution(&self, ctx: &RequestContext, movement: &Movement, changed: usize) {
        let event_type = match movement.status {
            MovementStatus::Approved => event_types::MOVEMENT_APPROVED,
            _ => event_types::MOVEMENT_REJECTED,
        };
        tracing::info!(
            movement_id = movement.id,
            status = %movement.status,
            resolver_id = ctx.actor.id,
            assets_changed = changed,
            "Movement resolved"
        );
        self.sink.emit(
            WorkflowEvent::new(EventKind::Notification, event_type, ctx.now)
                .with_actor(ctx.actor.id)
                .with_subject("movement", movement.id)
                .with_payload(serde_json::json!({
                    "status": movement.status,
                    "recipient_id": movement.requester_id,
                    "assets_changed": changed,
                    "rejection_reason": movement.rejection_reason,
                })),
        );
        if changed > 0 {
            self.sink.emit(
                WorkflowEvent::new(EventKind::Audit, event_type, ctx.now)
                    .with_actor(ctx.actor.id)
                    .with_subject("movement", movement.id)
                    .with_payload(serde_json::json!({ "asset_ids": movement.asset_ids })),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get_movement(
        &self,
        ctx: &RequestContext,
        movement_id: DbId,
    ) -> Result<Movement, WorkflowError> {
        let movement = self.load_movement(movement_id).await?;
        let visible = self.visible(ctx, vec![movement]).await?;
        visible
            .into_iter()
            .next()
            .ok_or(WorkflowError::NotVisible(movement_id))
    }

    /// Movements matching `filter` that the caller may see: admins see all;
    /// others see their own requests, their authorizations, and movements
    /// touching assets in their scope.
    pub async fn list_movements(
        &self,
        ctx: &RequestContext,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, WorkflowError> {
        let movements = self.store.list_movements(filter).await?;
        self.visible(ctx, movements).await
    }

    /// The caller's review queue. Admins see every pending movement.
    pub async fn pending_for_authorizer(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Movement>, WorkflowError> {
        let filter = MovementFilter {
            status: Some(MovementStatus::Pending),
            authorizer_id: (!ctx.actor.is_admin()).then_some(ctx.actor.id),
            ..MovementFilter::default()
        };
        self.store.list_movements(&filter).await.map_err(Into::into)
    }

    /// Actors who could authorize a movement of assets in `area_id`: every
    /// active admin plus the active supervisors of that area.
    pub async fn eligible_authorizers(
        &self,
        area_id: DbId,
    ) -> Result<Vec<AuthorizerCandidate>, WorkflowError> {
        if self.store.get_area(area_id).await?.is_none() {
            return Err(WorkflowError::not_found("Area", area_id));
        }
        let candidates = self.store.list_authorizer_candidates().await?;
        Ok(candidates
            .into_iter()
            .filter(|actor| can_authorize_area(actor, area_id))
            .filter_map(|actor| {
                let role = actor.role()?;
                Some(AuthorizerCandidate {
                    id: actor.id,
                    display_name: actor.display_name,
                    role,
                })
            })
            .collect())
    }

    async fn visible(
        &self,
        ctx: &RequestContext,
        movements: Vec<Movement>,
    ) -> Result<Vec<Movement>, WorkflowError> {
        if ctx.actor.is_admin() {
            return Ok(movements);
        }
        let scope = scope::resolve(&ctx.actor);
        let asset_ids: BTreeSet<DbId> = movements
            .iter()
            .filter(|m| m.requester_id != ctx.actor.id && m.authorizer_id != ctx.actor.id)
            .flat_map(|m| m.asset_ids.iter().copied())
            .collect();
        let located: HashMap<DbId, LocatedAsset> = if asset_ids.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<DbId> = asset_ids.into_iter().collect();
            self.store
                .locate_assets(&ids)
                .await?
                .into_iter()
                .map(|a| (a.asset.id, a))
                .collect()
        };

        Ok(movements
            .into_iter()
            .filter(|m| {
                m.requester_id == ctx.actor.id
                    || m.authorizer_id == ctx.actor.id
                    || m.asset_ids.iter().any(|id| {
                        located
                            .get(id)
                            .is_some_and(|a| scope::can_view(&scope, a))
                    })
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_movement(&self, movement_id: DbId) -> Result<Movement, WorkflowError> {
        self.store
            .get_movement(movement_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Movement", movement_id))
    }

    /// Load targets in request order; the first unknown code is not found.
    async fn load_by_codes(&self, codes: &[String]) -> Result<Vec<LocatedAsset>, WorkflowError> {
        let mut by_code: HashMap<String, LocatedAsset> = self
            .store
            .locate_assets_by_codes(codes)
            .await?
            .into_iter()
            .map(|a| (a.asset.internal_code.clone(), a))
            .collect();
        codes
            .iter()
            .map(|code| {
                by_code
                    .remove(code)
                    .ok_or_else(|| WorkflowError::not_found("Asset", code))
            })
            .collect()
    }

    async fn load_by_ids(&self, ids: &[DbId]) -> Result<Vec<LocatedAsset>, WorkflowError> {
        let mut by_id: HashMap<DbId, LocatedAsset> = self
            .store
            .locate_assets(ids)
            .await?
            .into_iter()
            .map(|a| (a.asset.id, a))
            .collect();
        ids.iter()
            .map(|id| {
                by_id
                    .remove(id)
                    .ok_or_else(|| WorkflowError::not_found("Asset", id))
            })
            .collect()
    }

    fn record_denied(&self, ctx: &RequestContext, codes: &[String], err: &WorkflowError) {
        tracing::warn!(
            actor_id = ctx.actor.id,
            error = %err,
            asset_codes = ?codes,
            "Movement attempt denied"
        );
        self.sink.emit(
            WorkflowEvent::new(EventKind::Audit, event_types::MOVEMENT_DENIED, ctx.now)
                .with_actor(ctx.actor.id)
                .with_payload(serde_json::json!({
                    "reason": err.to_string(),
                    "asset_codes": codes,
                })),
        );
    }
}

// ---------------------------------------------------------------------------
// Authorization checks
// ---------------------------------------------------------------------------

fn check_campuses(scope: &ScopeDescriptor, targets: &[LocatedAsset]) -> Result<(), WorkflowError> {
    let offending: Vec<String> = targets
        .iter()
        .filter(|t| !scope.campus_permitted(t.campus_id))
        .map(|t| t.asset.internal_code.clone())
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::CampusNotPermitted(offending))
    }
}

fn check_in_scope(scope: &ScopeDescriptor, targets: &[LocatedAsset]) -> Result<(), WorkflowError> {
    let offending: Vec<String> = targets
        .iter()
        .filter(|t| !scope::can_act_on(scope, t))
        .map(|t| t.asset.internal_code.clone())
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::not_in_scope(offending))
    }
}

/// Admins may authorize anything; supervisors only movements touching one of
/// their areas.
fn authorizer_eligible(authorizer: &Actor, targets: &[LocatedAsset]) -> bool {
    targets
        .iter()
        .any(|t| can_authorize_area(authorizer, t.asset.area_id))
}

fn can_authorize_area(actor: &Actor, area_id: DbId) -> bool {
    match actor.active_profile() {
        Some(profile) if profile.role == Role::Admin => true,
        Some(profile) if profile.role == Role::Supervisor => profile.area_ids.contains(&area_id),
        _ => false,
    }
}

fn plan_rejection(
    ctx: &RequestContext,
    movement: &Movement,
    reason: &str,
) -> Result<Resolution, WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::EmptyRejectionReason);
    }
    Ok(Resolution {
        movement_id: movement.id,
        status: MovementStatus::Rejected,
        resolver_id: ctx.actor.id,
        resolved_at: ctx.now,
        rejection_reason: Some(reason.to_string()),
        changes: Vec::new(),
        notification: notification::movement_rejected(
            movement,
            &ctx.actor.display_name,
            reason,
            ctx.now,
        ),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
