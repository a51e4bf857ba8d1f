//! In-app notifications addressed to a single actor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::CoreError;
use crate::movement::Movement;
use crate::store::NotificationStore;
use crate::types::{DbId, Timestamp};

/// Maximum page size for notification listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
pub const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MovementCreated,
    MovementApproved,
    MovementRejected,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::MovementCreated => "movement_created",
            NotificationKind::MovementApproved => "movement_approved",
            NotificationKind::MovementRejected => "movement_rejected",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movement_created" => Ok(NotificationKind::MovementCreated),
            "movement_approved" => Ok(NotificationKind::MovementApproved),
            "movement_rejected" => Ok(NotificationKind::MovementRejected),
            other => Err(format!("Unknown notification kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub movement_id: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub movement_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Sent to the proposed authorizer; `movement_id` is filled in on insert.
pub fn movement_created(
    authorizer_id: DbId,
    requester_name: &str,
    movement_type: &str,
    asset_count: usize,
    at: Timestamp,
) -> NewNotification {
    NewNotification {
        recipient_id: authorizer_id,
        kind: NotificationKind::MovementCreated,
        title: "New movement request".into(),
        message: format!(
            "{requester_name} requested a {movement_type} movement for {asset_count} asset(s)"
        ),
        movement_id: None,
        created_at: at,
    }
}

pub fn movement_approved(movement: &Movement, resolver_name: &str, at: Timestamp) -> NewNotification {
    NewNotification {
        recipient_id: movement.requester_id,
        kind: NotificationKind::MovementApproved,
        title: "Movement approved".into(),
        message: format!(
            "Your {} movement #{} was approved by {resolver_name}",
            movement.movement_type, movement.id
        ),
        movement_id: Some(movement.id),
        created_at: at,
    }
}

pub fn movement_rejected(
    movement: &Movement,
    resolver_name: &str,
    reason: &str,
    at: Timestamp,
) -> NewNotification {
    NewNotification {
        recipient_id: movement.requester_id,
        kind: NotificationKind::MovementRejected,
        title: "Movement rejected".into(),
        message: format!(
            "Your {} movement #{} was rejected by {resolver_name}: {reason}",
            movement.movement_type, movement.id
        ),
        movement_id: Some(movement.id),
        created_at: at,
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// List the calling actor's notifications.
pub async fn list_for_actor<S>(
    store: &S,
    ctx: &RequestContext,
    unread_only: bool,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Vec<Notification>, CoreError>
where
    S: NotificationStore + ?Sized,
{
    store
        .list_notifications(ctx.actor.id, unread_only, clamp_limit(limit), clamp_offset(offset))
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))
}

/// Mark one of the caller's notifications read. Unknown, foreign, or already
/// read notifications are reported as not found.
pub async fn mark_read<S>(store: &S, ctx: &RequestContext, id: DbId) -> Result<(), CoreError>
where
    S: NotificationStore + ?Sized,
{
    let updated = store
        .mark_notification_read(id, ctx.actor.id, ctx.now)
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?;
    if !updated {
        return Err(CoreError::not_found("Notification", id));
    }
    Ok(())
}

pub async fn mark_all_read<S>(store: &S, ctx: &RequestContext) -> Result<u64, CoreError>
where
    S: NotificationStore + ?Sized,
{
    store
        .mark_all_notifications_read(ctx.actor.id, ctx.now)
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))
}

pub async fn unread_count<S>(store: &S, ctx: &RequestContext) -> Result<i64, CoreError>
where
    S: NotificationStore + ?Sized,
{
    store
        .unread_notification_count(ctx.actor.id)
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))
}
