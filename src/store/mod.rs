//! Persistence port for threads, comments and votes.
//!
//! Every method is all-or-nothing. The two races called out for a
//! multi-instance deployment are owned by the adapters: thread creation is an
//! insert-or-refetch on the entity key, and a vote plus its score adjustment
//! commit as one unit keyed on (comment, user).

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::DiscussionResult,
    models::{Comment, CommentFilter, EntityKey, NewComment, Thread, VoteDirection, VoteOutcome},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDiscussionStore;
pub use postgres::PgDiscussionStore;

#[async_trait]
pub trait DiscussionStore: Send + Sync {
    async fn find_thread(&self, thread_id: Uuid) -> DiscussionResult<Option<Thread>>;

    async fn find_thread_by_entity(&self, key: EntityKey) -> DiscussionResult<Option<Thread>>;

    /// Returns the thread for `key`, inserting it if absent. Concurrent callers
    /// for the same key all observe the same row.
    async fn get_or_create_thread(&self, key: EntityKey) -> DiscussionResult<Thread>;

    async fn set_thread_locked(
        &self,
        thread_id: Uuid,
        is_locked: bool,
    ) -> DiscussionResult<Option<Thread>>;

    /// Inserts a comment with zero score and no moderation flags. Fails with
    /// `ThreadLocked` if the thread is locked at commit time.
    async fn insert_comment(&self, comment: NewComment) -> DiscussionResult<Comment>;

    /// Fetches a comment including tombstones.
    async fn find_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>>;

    /// The following mutators only touch live comments and return `None`
    /// for missing or soft-deleted ones.
    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> DiscussionResult<Option<Comment>>;

    async fn soft_delete_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>>;

    async fn set_comment_hidden(
        &self,
        comment_id: Uuid,
        is_hidden: bool,
    ) -> DiscussionResult<Option<Comment>>;

    async fn set_comment_pinned(
        &self,
        comment_id: Uuid,
        is_pinned: bool,
    ) -> DiscussionResult<Option<Comment>>;

    /// One level of one thread, filtered, ordered and paged per `filter`.
    async fn list_comments(&self, filter: &CommentFilter) -> DiscussionResult<Vec<Comment>>;

    /// Applies the vote toggle law atomically. Fails with `CommentNotFound`
    /// for missing or soft-deleted comments.
    async fn apply_vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> DiscussionResult<VoteOutcome>;

    async fn viewer_votes(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> DiscussionResult<HashMap<Uuid, VoteDirection>>;
}
