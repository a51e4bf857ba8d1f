//! Access scope: which assets an actor may see or act on.
//!
//! - Admins are unrestricted.
//! - Supervisors act on their assigned areas.
//! - Auxiliaries act on their assigned areas and on anything located in their
//!   assigned campuses.
//! - Externals, inactive profiles, and actors without a profile get no write
//!   scope; they can only see assets they hold in custody.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::assets::LocatedAsset;
use crate::roles::Role;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Role and assignments of an actor, persisted outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub role: Role,
    pub area_ids: BTreeSet<DbId>,
    pub campus_ids: BTreeSet<DbId>,
    /// Collaborator record linked to this actor (custody visibility).
    pub collaborator_id: Option<DbId>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub display_name: String,
    pub profile: Option<ActorProfile>,
}

impl Actor {
    /// The actor's profile when present and active.
    pub fn active_profile(&self) -> Option<&ActorProfile> {
        self.profile.as_ref().filter(|p| p.is_active)
    }

    pub fn role(&self) -> Option<Role> {
        self.active_profile().map(|p| p.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

// ---------------------------------------------------------------------------
// Scope descriptor
// ---------------------------------------------------------------------------

/// A set of permitted ids, or everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permitted {
    All,
    Only(BTreeSet<DbId>),
}

impl Permitted {
    pub fn none() -> Self {
        Permitted::Only(BTreeSet::new())
    }

    pub fn contains(&self, id: DbId) -> bool {
        match self {
            Permitted::All => true,
            Permitted::Only(ids) => ids.contains(&id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeDescriptor {
    pub actor_id: DbId,
    /// `None` for actors without an active profile.
    pub role: Option<Role>,
    pub areas: Permitted,
    pub campuses: Permitted,
    /// Linked collaborator; grants read access to assets in their custody.
    pub custodian: Option<DbId>,
    pub can_write: bool,
}

/// Resolve an actor into the scope every other check consults.
pub fn resolve(actor: &Actor) -> ScopeDescriptor {
    let custodian = actor.profile.as_ref().and_then(|p| p.collaborator_id);
    let read_only = ScopeDescriptor {
        actor_id: actor.id,
        role: actor.role(),
        areas: Permitted::none(),
        campuses: Permitted::none(),
        custodian,
        can_write: false,
    };

    let Some(profile) = actor.active_profile() else {
        return read_only;
    };

    match profile.role {
        Role::Admin => ScopeDescriptor {
            areas: Permitted::All,
            campuses: Permitted::All,
            can_write: true,
            ..read_only
        },
        Role::Supervisor | Role::Auxiliary => ScopeDescriptor {
            areas: Permitted::Only(profile.area_ids.clone()),
            campuses: Permitted::Only(profile.campus_ids.clone()),
            can_write: true,
            ..read_only
        },
        Role::External => read_only,
    }
}

impl ScopeDescriptor {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_auxiliary(&self) -> bool {
        self.role == Some(Role::Auxiliary)
    }

    /// Whether an asset in `area_id`, located in `campus_id`, is writable.
    pub fn covers(&self, area_id: DbId, campus_id: Option<DbId>) -> bool {
        if !self.can_write {
            return false;
        }
        if self.is_admin() || self.areas.contains(area_id) {
            return true;
        }
        self.is_auxiliary() && campus_id.is_some_and(|c| self.campuses.contains(c))
    }

    /// Campus restriction applied to auxiliaries before any other check.
    /// Unlocated assets are left to the area check.
    pub fn campus_permitted(&self, campus_id: Option<DbId>) -> bool {
        if !self.is_auxiliary() {
            return true;
        }
        campus_id.map_or(true, |c| self.campuses.contains(c))
    }
}

pub fn can_act_on(scope: &ScopeDescriptor, asset: &LocatedAsset) -> bool {
    scope.covers(asset.asset.area_id, asset.campus_id)
}

/// Act-on scope plus read access to assets the actor holds in custody.
pub fn can_view(scope: &ScopeDescriptor, asset: &LocatedAsset) -> bool {
    can_act_on(scope, asset)
        || scope
            .custodian
            .is_some_and(|c| asset.asset.custodian_id == Some(c))
}

pub fn filter_visible(scope: &ScopeDescriptor, assets: Vec<LocatedAsset>) -> Vec<LocatedAsset> {
    assets.into_iter().filter(|a| can_view(scope, a)).collect()
}
