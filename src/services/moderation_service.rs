use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{DiscussionError, DiscussionResult},
    models::{CommentResponse, MembershipTier, Thread},
    services::{
        discussion_service::DiscussionService,
        profile_service::{EntityResolver, PermissionOracle},
    },
};

/// Decides whether an actor may moderate a thread on behalf of a profile.
/// It owns no state; the tier check is delegated to the permission oracle.
#[derive(Clone)]
pub struct ModerationAuthority {
    oracle: Arc<dyn PermissionOracle>,
    resolver: Arc<dyn EntityResolver>,
    minimum_tier: MembershipTier,
}

impl ModerationAuthority {
    pub fn new(
        oracle: Arc<dyn PermissionOracle>,
        resolver: Arc<dyn EntityResolver>,
        minimum_tier: MembershipTier,
    ) -> Self {
        Self {
            oracle,
            resolver,
            minimum_tier,
        }
    }

    pub async fn can_moderate(&self, user_id: Uuid, profile_slug: &str) -> DiscussionResult<bool> {
        self.oracle
            .has_access(user_id, profile_slug, self.minimum_tier)
            .await
    }

    /// Succeeds when `profile_slug` owns the thread's entity and the actor
    /// holds the moderator tier on it.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        profile_slug: &str,
        thread: &Thread,
    ) -> DiscussionResult<()> {
        let owner = self
            .resolver
            .owning_profile(thread.entity_kind, thread.entity_id)
            .await?;

        if owner.as_deref() != Some(profile_slug) {
            tracing::warn!(
                %user_id,
                thread_id = %thread.id,
                profile_slug,
                "moderation attempted through a profile that does not own the thread"
            );
            return Err(DiscussionError::InsufficientPermission);
        }

        if !self.can_moderate(user_id, profile_slug).await? {
            tracing::warn!(%user_id, thread_id = %thread.id, profile_slug, "moderation denied");
            return Err(DiscussionError::InsufficientPermission);
        }

        Ok(())
    }
}

impl DiscussionService {
    pub async fn can_moderate(&self, user_id: Uuid, profile_slug: &str) -> DiscussionResult<bool> {
        self.authority.can_moderate(user_id, profile_slug).await
    }

    pub async fn hide_comment(
        &self,
        comment_id: Uuid,
        acting_user_id: Uuid,
        profile_slug: &str,
        is_hidden: bool,
    ) -> DiscussionResult<CommentResponse> {
        let (_, thread) = self.live_comment_with_thread(comment_id).await?;
        self.authority
            .authorize(acting_user_id, profile_slug, &thread)
            .await?;

        let comment = self
            .store
            .set_comment_hidden(comment_id, is_hidden)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;

        tracing::info!(%comment_id, %acting_user_id, is_hidden, "comment visibility set");
        Ok(CommentResponse::new(comment, None))
    }

    pub async fn pin_comment(
        &self,
        comment_id: Uuid,
        acting_user_id: Uuid,
        profile_slug: &str,
        is_pinned: bool,
    ) -> DiscussionResult<CommentResponse> {
        let (_, thread) = self.live_comment_with_thread(comment_id).await?;
        self.authority
            .authorize(acting_user_id, profile_slug, &thread)
            .await?;

        let comment = self
            .store
            .set_comment_pinned(comment_id, is_pinned)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;

        tracing::info!(%comment_id, %acting_user_id, is_pinned, "comment pin set");
        Ok(CommentResponse::new(comment, None))
    }

    pub async fn lock_thread(
        &self,
        thread_id: Uuid,
        acting_user_id: Uuid,
        profile_slug: &str,
        is_locked: bool,
    ) -> DiscussionResult<Thread> {
        let thread = self.get_thread(thread_id).await?;
        self.authority
            .authorize(acting_user_id, profile_slug, &thread)
            .await?;

        let thread = self
            .store
            .set_thread_locked(thread_id, is_locked)
            .await?
            .ok_or(DiscussionError::ThreadNotFound)?;

        tracing::info!(%thread_id, %acting_user_id, is_locked, "thread lock set");
        Ok(thread)
    }
}
