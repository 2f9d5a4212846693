use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::DiscussionLimits,
    error::{DiscussionError, DiscussionResult},
    models::{
        Comment, CommentResponse, EntityKey, EntityKind, NewComment, ResolvedEntity, Thread,
        ThreadRef,
    },
    services::{
        moderation_service::ModerationAuthority,
        profile_service::{EntityResolver, FeatureFlags, PermissionOracle},
    },
    store::DiscussionStore,
};

/// Comment threads attached to stories and profiles.
///
/// Callers hand in already-resolved identities; the service never
/// authenticates. Moderation-gated operations go through the
/// [`ModerationAuthority`], author-only ones compare user ids.
#[derive(Clone)]
pub struct DiscussionService {
    pub(crate) store: Arc<dyn DiscussionStore>,
    pub(crate) resolver: Arc<dyn EntityResolver>,
    pub(crate) flags: Arc<dyn FeatureFlags>,
    pub(crate) authority: ModerationAuthority,
    pub(crate) limits: DiscussionLimits,
}

impl DiscussionService {
    pub fn new(
        store: Arc<dyn DiscussionStore>,
        resolver: Arc<dyn EntityResolver>,
        oracle: Arc<dyn PermissionOracle>,
        flags: Arc<dyn FeatureFlags>,
        limits: DiscussionLimits,
    ) -> Self {
        let authority = ModerationAuthority::new(oracle, resolver.clone(), limits.moderator_tier);
        Self {
            store,
            resolver,
            flags,
            authority,
            limits,
        }
    }

    /// Resolves an entity slug, checks that its profile has discussions
    /// enabled and returns the entity's thread, creating it on first access.
    pub async fn open_discussion(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> DiscussionResult<(Thread, ResolvedEntity)> {
        let entity = self
            .resolver
            .resolve(kind, slug)
            .await?
            .ok_or(DiscussionError::EntityNotFound)?;

        self.ensure_enabled(&entity.profile_slug).await?;

        let thread = self.get_or_create_thread(entity.key()).await?;
        Ok((thread, entity))
    }

    pub async fn get_or_create_thread(&self, key: EntityKey) -> DiscussionResult<Thread> {
        self.store.get_or_create_thread(key).await
    }

    pub async fn get_thread(&self, thread_id: Uuid) -> DiscussionResult<Thread> {
        self.store
            .find_thread(thread_id)
            .await?
            .ok_or(DiscussionError::ThreadNotFound)
    }

    /// Fetches one comment. Comments are not translated, so `locale` does not
    /// change the result. Tombstones are returned with masked content; hidden
    /// comments only reach viewers who may moderate the thread.
    pub async fn get_comment(
        &self,
        comment_id: Uuid,
        locale: Option<&str>,
        viewer_id: Option<Uuid>,
    ) -> DiscussionResult<CommentResponse> {
        tracing::debug!(%comment_id, locale = locale.unwrap_or("-"), "get comment");

        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;

        if comment.is_hidden && !self.viewer_moderates(comment.thread_id, viewer_id).await? {
            return Err(DiscussionError::CommentNotFound);
        }

        let mut responses = self.with_viewer_votes(vec![comment], viewer_id).await?;
        responses
            .pop()
            .ok_or_else(|| DiscussionError::Internal("comment lost while decorating".to_string()))
    }

    pub async fn create_comment(
        &self,
        thread_ref: ThreadRef,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: &str,
    ) -> DiscussionResult<CommentResponse> {
        let (thread, depth) = match parent_id {
            Some(parent_id) => {
                let (parent, thread) = self.live_comment_with_thread(parent_id).await?;
                // A reply cannot be pointed at another thread than its parent's.
                if !thread_ref.matches(&thread) {
                    return Err(DiscussionError::CommentNotFound);
                }
                (thread, parent.depth + 1)
            }
            None => {
                let thread = match thread_ref {
                    ThreadRef::Entity(key) => self.thread_for_new_comment(key, content).await?,
                    ThreadRef::Thread(thread_id) => self.get_thread(thread_id).await?,
                };
                (thread, 0)
            }
        };

        if thread.is_locked {
            return Err(DiscussionError::ThreadLocked);
        }

        if depth > self.limits.max_depth {
            return Err(DiscussionError::MaxNestingDepth {
                max: self.limits.max_depth,
            });
        }

        let content = self.validate_content(content)?;

        let owner = self.owning_profile(&thread).await?;
        self.ensure_enabled(&owner).await?;

        let comment = self
            .store
            .insert_comment(NewComment {
                thread_id: thread.id,
                parent_id,
                author_id,
                content,
                depth,
            })
            .await?;

        tracing::info!(
            comment_id = %comment.id,
            thread_id = %thread.id,
            user_id = %author_id,
            depth,
            "comment created"
        );

        Ok(CommentResponse::new(comment, None))
    }

    pub async fn edit_comment(
        &self,
        comment_id: Uuid,
        acting_user_id: Uuid,
        content: &str,
    ) -> DiscussionResult<CommentResponse> {
        let comment = self.live_comment(comment_id).await?;

        if comment.author_id != acting_user_id {
            tracing::warn!(%comment_id, user_id = %acting_user_id, "edit by non-author denied");
            return Err(DiscussionError::InsufficientPermission);
        }

        let content = self.validate_content(content)?;

        let comment = self
            .store
            .update_comment_content(comment_id, &content)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;

        tracing::info!(%comment_id, user_id = %acting_user_id, "comment edited");

        let mut responses = self
            .with_viewer_votes(vec![comment], Some(acting_user_id))
            .await?;
        responses
            .pop()
            .ok_or_else(|| DiscussionError::Internal("comment lost while decorating".to_string()))
    }

    /// Soft-deletes a comment. Authors may always delete their own; anyone
    /// else needs moderator standing on `profile_slug`.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        acting_user_id: Uuid,
        profile_slug: &str,
    ) -> DiscussionResult<()> {
        let (comment, thread) = self.live_comment_with_thread(comment_id).await?;

        if comment.author_id != acting_user_id {
            self.authority
                .authorize(acting_user_id, profile_slug, &thread)
                .await?;
        }

        self.store
            .soft_delete_comment(comment_id)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;

        tracing::info!(%comment_id, user_id = %acting_user_id, "comment deleted");
        Ok(())
    }

    /// Thread holding `comment_id`, tombstones included.
    pub async fn thread_of_comment(&self, comment_id: Uuid) -> DiscussionResult<Thread> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or(DiscussionError::CommentNotFound)?;
        self.get_thread(comment.thread_id).await
    }

    async fn viewer_moderates(
        &self,
        thread_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> DiscussionResult<bool> {
        let Some(viewer_id) = viewer_id else {
            return Ok(false);
        };
        let thread = self.get_thread(thread_id).await?;
        let owner = self.owning_profile(&thread).await?;
        self.can_moderate(viewer_id, &owner).await
    }

    /// Slug of the profile whose members moderate `thread`.
    pub async fn owning_profile(&self, thread: &Thread) -> DiscussionResult<String> {
        self.resolver
            .owning_profile(thread.entity_kind, thread.entity_id)
            .await?
            .ok_or(DiscussionError::EntityNotFound)
    }

    pub(crate) async fn live_comment(&self, comment_id: Uuid) -> DiscussionResult<Comment> {
        self.store
            .find_comment(comment_id)
            .await?
            .filter(|comment| !comment.is_deleted())
            .ok_or(DiscussionError::CommentNotFound)
    }

    pub(crate) async fn live_comment_with_thread(
        &self,
        comment_id: Uuid,
    ) -> DiscussionResult<(Comment, Thread)> {
        let comment = self.live_comment(comment_id).await?;
        let thread = self.get_thread(comment.thread_id).await?;
        Ok((comment, thread))
    }

    /// Existing thread for `key`, or a new one once the comment that would
    /// open it has passed every check. A rejected comment creates nothing.
    async fn thread_for_new_comment(
        &self,
        key: EntityKey,
        content: &str,
    ) -> DiscussionResult<Thread> {
        if let Some(thread) = self.store.find_thread_by_entity(key).await? {
            return Ok(thread);
        }

        self.validate_content(content)?;
        let owner = self
            .resolver
            .owning_profile(key.kind, key.id)
            .await?
            .ok_or(DiscussionError::EntityNotFound)?;
        self.ensure_enabled(&owner).await?;

        self.get_or_create_thread(key).await
    }

    async fn ensure_enabled(&self, profile_slug: &str) -> DiscussionResult<()> {
        if self.flags.discussions_enabled(profile_slug).await? {
            Ok(())
        } else {
            Err(DiscussionError::DiscussionsNotEnabled)
        }
    }

    /// Trims and length-checks content, counting characters rather than bytes.
    fn validate_content(&self, content: &str) -> DiscussionResult<String> {
        let content = content.trim();
        let length = content.chars().count();

        if length < self.limits.min_content_length {
            return Err(DiscussionError::ContentTooShort {
                min: self.limits.min_content_length,
            });
        }
        if length > self.limits.max_content_length {
            return Err(DiscussionError::ContentTooLong {
                max: self.limits.max_content_length,
            });
        }

        Ok(content.to_string())
    }
}
