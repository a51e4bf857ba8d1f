//! Rows for `actors` left-joined with `actor_profiles`.

use assetflow_core::scope::{Actor, ActorProfile};
use assetflow_core::store::StoreError;
use assetflow_core::types::DbId;
use sqlx::FromRow;

use super::parse_column;

/// Profile columns are all `NULL` for actors without a profile.
#[derive(Debug, Clone, FromRow)]
pub struct ActorRow {
    pub id: DbId,
    pub display_name: String,
    pub role: Option<String>,
    pub area_ids: Option<Vec<DbId>>,
    pub campus_ids: Option<Vec<DbId>>,
    pub collaborator_id: Option<DbId>,
    pub profile_active: Option<bool>,
}

impl TryFrom<ActorRow> for Actor {
    type Error = StoreError;

    fn try_from(row: ActorRow) -> Result<Self, Self::Error> {
        let profile = match row.role.as_deref() {
            Some(role) => Some(ActorProfile {
                role: parse_column("actor_profiles.role", role)?,
                area_ids: row.area_ids.unwrap_or_default().into_iter().collect(),
                campus_ids: row.campus_ids.unwrap_or_default().into_iter().collect(),
                collaborator_id: row.collaborator_id,
                is_active: row.profile_active.unwrap_or(false),
            }),
            None => None,
        };
        Ok(Actor {
            id: row.id,
            display_name: row.display_name,
            profile,
        })
    }
}
