//! Repository for `actors`, `actor_profiles`, and `collaborators`.

use assetflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::actor::ActorRow;
use crate::models::asset::CollaboratorRow;

const ACTOR_COLUMNS: &str = "a.id, a.display_name, p.role, p.area_ids, p.campus_ids, \
    p.collaborator_id, p.is_active AS profile_active";

const COLLABORATOR_COLUMNS: &str = "id, full_name, unit, email, phone, is_active";

pub struct DirectoryRepo;

impl DirectoryRepo {
    pub async fn find_actor(pool: &PgPool, id: DbId) -> Result<Option<ActorRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTOR_COLUMNS} FROM actors a \
             LEFT JOIN actor_profiles p ON p.actor_id = a.id \
             WHERE a.id = $1"
        );
        sqlx::query_as::<_, ActorRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_authorizer_candidates(pool: &PgPool) -> Result<Vec<ActorRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTOR_COLUMNS} FROM actors a \
             JOIN actor_profiles p ON p.actor_id = a.id \
             WHERE p.is_active AND p.role IN ('admin', 'supervisor') \
             ORDER BY a.display_name, a.id"
        );
        sqlx::query_as::<_, ActorRow>(&query).fetch_all(pool).await
    }

    pub async fn find_collaborator(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CollaboratorRow>, sqlx::Error> {
        let query = format!("SELECT {COLLABORATOR_COLUMNS} FROM collaborators WHERE id = $1");
        sqlx::query_as::<_, CollaboratorRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
