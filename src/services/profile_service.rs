//! Narrow views onto the profile subsystem: slug resolution, membership
//! checks and the discussions feature flag. The engine consumes these through
//! traits; the Postgres directory reads the profile tables directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::DiscussionResult,
    models::{EntityKind, MembershipTier, ResolvedEntity},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn resolve(&self, kind: EntityKind, slug: &str)
    -> DiscussionResult<Option<ResolvedEntity>>;

    /// Slug of the profile whose members govern the entity's discussion.
    async fn owning_profile(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> DiscussionResult<Option<String>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn has_access(
        &self,
        user_id: Uuid,
        profile_slug: &str,
        minimum_tier: MembershipTier,
    ) -> DiscussionResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureFlags: Send + Sync {
    async fn discussions_enabled(&self, profile_slug: &str) -> DiscussionResult<bool>;
}

#[derive(Clone)]
pub struct PgProfileDirectory {
    db: PgPool,
}

impl PgProfileDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityResolver for PgProfileDirectory {
    async fn resolve(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> DiscussionResult<Option<ResolvedEntity>> {
        let query = match kind {
            EntityKind::Story => {
                r#"
                SELECT s.id, p.slug AS profile_slug
                FROM stories s
                JOIN profiles p ON s.profile_id = p.id
                WHERE s.slug = $1
                "#
            }
            EntityKind::Profile => "SELECT p.id, p.slug AS profile_slug FROM profiles p WHERE p.slug = $1",
        };

        let row = sqlx::query(query).bind(slug).fetch_optional(&self.db).await?;

        Ok(row.map(|row| ResolvedEntity {
            kind,
            entity_id: row.get("id"),
            profile_slug: row.get("profile_slug"),
        }))
    }

    async fn owning_profile(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> DiscussionResult<Option<String>> {
        let query = match kind {
            EntityKind::Story => {
                r#"
                SELECT p.slug
                FROM stories s
                JOIN profiles p ON s.profile_id = p.id
                WHERE s.id = $1
                "#
            }
            EntityKind::Profile => "SELECT p.slug FROM profiles p WHERE p.id = $1",
        };

        let row = sqlx::query(query)
            .bind(entity_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| row.get("slug")))
    }
}

#[async_trait]
impl PermissionOracle for PgProfileDirectory {
    async fn has_access(
        &self,
        user_id: Uuid,
        profile_slug: &str,
        minimum_tier: MembershipTier,
    ) -> DiscussionResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT m.tier
            FROM profile_memberships m
            JOIN profiles p ON m.profile_id = p.id
            WHERE p.slug = $1 AND m.user_id = $2
            "#,
        )
        .bind(profile_slug)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row
            .map(|row| row.get::<MembershipTier, _>("tier") >= minimum_tier)
            .unwrap_or(false))
    }
}

#[async_trait]
impl FeatureFlags for PgProfileDirectory {
    async fn discussions_enabled(&self, profile_slug: &str) -> DiscussionResult<bool> {
        let row = sqlx::query("SELECT discussions_enabled FROM profiles WHERE slug = $1")
            .bind(profile_slug)
            .fetch_optional(&self.db)
            .await?;

        Ok(row
            .map(|row| row.get::<bool, _>("discussions_enabled"))
            .unwrap_or(false))
    }
}

#[derive(Default)]
struct Directory {
    profiles: HashMap<String, (Uuid, bool)>,
    stories: HashMap<String, (Uuid, String)>,
    memberships: HashMap<(String, Uuid), MembershipTier>,
}

/// Profile directory held in memory, for tests and local runs.
#[derive(Default, Clone)]
pub struct InMemoryProfileDirectory {
    inner: Arc<RwLock<Directory>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, slug: &str, discussions_enabled: bool) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner
            .profiles
            .insert(slug.to_string(), (id, discussions_enabled));
        id
    }

    pub async fn add_story(&self, slug: &str, profile_slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner
            .stories
            .insert(slug.to_string(), (id, profile_slug.to_string()));
        id
    }

    pub async fn grant(&self, profile_slug: &str, user_id: Uuid, tier: MembershipTier) {
        let mut inner = self.inner.write().await;
        inner
            .memberships
            .insert((profile_slug.to_string(), user_id), tier);
    }

    pub async fn set_discussions_enabled(&self, profile_slug: &str, enabled: bool) {
        let mut inner = self.inner.write().await;
        if let Some(profile) = inner.profiles.get_mut(profile_slug) {
            profile.1 = enabled;
        }
    }
}

#[async_trait]
impl EntityResolver for InMemoryProfileDirectory {
    async fn resolve(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> DiscussionResult<Option<ResolvedEntity>> {
        let inner = self.inner.read().await;
        let resolved = match kind {
            EntityKind::Story => inner.stories.get(slug).map(|(id, profile_slug)| ResolvedEntity {
                kind,
                entity_id: *id,
                profile_slug: profile_slug.clone(),
            }),
            EntityKind::Profile => inner.profiles.get(slug).map(|(id, _)| ResolvedEntity {
                kind,
                entity_id: *id,
                profile_slug: slug.to_string(),
            }),
        };

        Ok(resolved)
    }

    async fn owning_profile(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> DiscussionResult<Option<String>> {
        let inner = self.inner.read().await;
        let owner = match kind {
            EntityKind::Story => inner
                .stories
                .values()
                .find(|(id, _)| *id == entity_id)
                .map(|(_, profile_slug)| profile_slug.clone()),
            EntityKind::Profile => inner
                .profiles
                .iter()
                .find(|(_, (id, _))| *id == entity_id)
                .map(|(slug, _)| slug.clone()),
        };

        Ok(owner)
    }
}

#[async_trait]
impl PermissionOracle for InMemoryProfileDirectory {
    async fn has_access(
        &self,
        user_id: Uuid,
        profile_slug: &str,
        minimum_tier: MembershipTier,
    ) -> DiscussionResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .get(&(profile_slug.to_string(), user_id))
            .is_some_and(|tier| *tier >= minimum_tier))
    }
}

#[async_trait]
impl FeatureFlags for InMemoryProfileDirectory {
    async fn discussions_enabled(&self, profile_slug: &str) -> DiscussionResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .profiles
            .get(profile_slug)
            .is_some_and(|(_, enabled)| *enabled))
    }
}
