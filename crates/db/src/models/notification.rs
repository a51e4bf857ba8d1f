//! Rows for `notifications`.

use assetflow_core::notification::Notification;
use assetflow_core::store::StoreError;
use assetflow_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::parse_column;

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub recipient_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub movement_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            kind: parse_column("notifications.kind", &row.kind)?,
            id: row.id,
            recipient_id: row.recipient_id,
            title: row.title,
            message: row.message,
            movement_id: row.movement_id,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}
