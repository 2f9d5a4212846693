use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discussion_entity_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Story,
    Profile,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Story => "story",
            EntityKind::Profile => "profile",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The natural key of a thread: one discussion per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.entity_kind, self.entity_id)
    }
}

/// Where a new comment goes. Replies always land in their parent's thread,
/// so for replies this is only cross-checked against the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRef {
    Entity(EntityKey),
    Thread(Uuid),
}

impl ThreadRef {
    pub fn matches(&self, thread: &Thread) -> bool {
        match self {
            ThreadRef::Entity(key) => *key == thread.entity_key(),
            ThreadRef::Thread(id) => *id == thread.id,
        }
    }
}

/// An entity slug as seen by the entity resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    pub kind: EntityKind,
    pub entity_id: Uuid,
    pub profile_slug: String,
}

impl ResolvedEntity {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.kind, self.entity_id)
    }
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub profile_slug: String,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl ThreadResponse {
    pub fn new(thread: &Thread, profile_slug: String) -> Self {
        Self {
            id: thread.id,
            entity_kind: thread.entity_kind,
            entity_id: thread.entity_id,
            profile_slug,
            is_locked: thread.is_locked,
            created_at: thread.created_at,
        }
    }
}

// Lock request
#[derive(Debug, Validate, Deserialize)]
pub struct LockThreadRequest {
    #[validate(length(min = 1, max = 100))]
    pub profile_slug: String,
    pub is_locked: bool,
}
