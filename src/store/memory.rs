//! In-process store for tests and single-node development. All state sits
//! behind one `RwLock`, so each method is a single critical section and the
//! atomicity contracts of [`DiscussionStore`] hold trivially.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{DiscussionError, DiscussionResult},
    models::{
        Comment, CommentFilter, DELETED_CONTENT, EntityKey, NewComment, Thread, VoteDirection,
        VoteOutcome,
    },
    services::{query_service, vote_service},
    store::DiscussionStore,
};

#[derive(Default)]
struct State {
    threads: HashMap<Uuid, Thread>,
    threads_by_entity: HashMap<EntityKey, Uuid>,
    comments: HashMap<Uuid, Comment>,
    votes: HashMap<(Uuid, Uuid), VoteDirection>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    // Strictly increasing so creation order is always observable in sorts.
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn live_comment_mut(&mut self, comment_id: Uuid) -> Option<&mut Comment> {
        self.comments
            .get_mut(&comment_id)
            .filter(|comment| !comment.is_deleted())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDiscussionStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryDiscussionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vote rows held for a comment.
    pub async fn vote_count(&self, comment_id: Uuid) -> usize {
        let state = self.state.read().await;
        state
            .votes
            .keys()
            .filter(|(voted_comment, _)| *voted_comment == comment_id)
            .count()
    }
}

#[async_trait]
impl DiscussionStore for InMemoryDiscussionStore {
    async fn find_thread(&self, thread_id: Uuid) -> DiscussionResult<Option<Thread>> {
        let state = self.state.read().await;
        Ok(state.threads.get(&thread_id).cloned())
    }

    async fn find_thread_by_entity(&self, key: EntityKey) -> DiscussionResult<Option<Thread>> {
        let state = self.state.read().await;
        Ok(state
            .threads_by_entity
            .get(&key)
            .and_then(|id| state.threads.get(id))
            .cloned())
    }

    async fn get_or_create_thread(&self, key: EntityKey) -> DiscussionResult<Thread> {
        let mut state = self.state.write().await;
        if let Some(thread) = state
            .threads_by_entity
            .get(&key)
            .and_then(|id| state.threads.get(id))
        {
            return Ok(thread.clone());
        }

        let now = state.now();
        let thread = Thread {
            id: Uuid::new_v4(),
            entity_kind: key.kind,
            entity_id: key.id,
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        state.threads_by_entity.insert(key, thread.id);
        state.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn set_thread_locked(
        &self,
        thread_id: Uuid,
        is_locked: bool,
    ) -> DiscussionResult<Option<Thread>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state.threads.get_mut(&thread_id).map(|thread| {
            thread.is_locked = is_locked;
            thread.updated_at = now;
            thread.clone()
        }))
    }

    async fn insert_comment(&self, comment: NewComment) -> DiscussionResult<Comment> {
        let mut state = self.state.write().await;
        match state.threads.get(&comment.thread_id) {
            None => return Err(DiscussionError::ThreadNotFound),
            Some(thread) if thread.is_locked => return Err(DiscussionError::ThreadLocked),
            Some(_) => {}
        }

        let created_at = state.now();
        let stored = Comment {
            id: Uuid::new_v4(),
            thread_id: comment.thread_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            content: comment.content,
            depth: comment.depth,
            score: 0,
            is_hidden: false,
            is_pinned: false,
            created_at,
            edited_at: None,
            deleted_at: None,
        };
        state.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.get(&comment_id).cloned())
    }

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> DiscussionResult<Option<Comment>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state.live_comment_mut(comment_id).map(|comment| {
            comment.content = content.to_string();
            comment.edited_at = Some(now);
            comment.clone()
        }))
    }

    async fn soft_delete_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state.live_comment_mut(comment_id).map(|comment| {
            comment.content = DELETED_CONTENT.to_string();
            comment.deleted_at = Some(now);
            comment.clone()
        }))
    }

    async fn set_comment_hidden(
        &self,
        comment_id: Uuid,
        is_hidden: bool,
    ) -> DiscussionResult<Option<Comment>> {
        let mut state = self.state.write().await;
        Ok(state.live_comment_mut(comment_id).map(|comment| {
            comment.is_hidden = is_hidden;
            comment.clone()
        }))
    }

    async fn set_comment_pinned(
        &self,
        comment_id: Uuid,
        is_pinned: bool,
    ) -> DiscussionResult<Option<Comment>> {
        let mut state = self.state.write().await;
        Ok(state.live_comment_mut(comment_id).map(|comment| {
            comment.is_pinned = is_pinned;
            comment.clone()
        }))
    }

    async fn list_comments(&self, filter: &CommentFilter) -> DiscussionResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .values()
            .filter(|c| c.thread_id == filter.thread_id && c.parent_id == filter.parent_id)
            .filter(|c| filter.include_hidden || !c.is_hidden)
            .collect();

        comments.sort_by(|a, b| query_service::compare(filter.sort, a, b));

        Ok(comments
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn apply_vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> DiscussionResult<VoteOutcome> {
        let mut state = self.state.write().await;
        if state.live_comment_mut(comment_id).is_none() {
            return Err(DiscussionError::CommentNotFound);
        }

        let key = (comment_id, user_id);
        let transition = vote_service::resolve_vote(state.votes.get(&key).copied(), direction);
        match transition.stored {
            Some(stored) => state.votes.insert(key, stored),
            None => state.votes.remove(&key),
        };

        let comment = state
            .live_comment_mut(comment_id)
            .ok_or(DiscussionError::CommentNotFound)?;
        comment.score += transition.score_delta;

        Ok(VoteOutcome {
            score: comment.score,
            viewer_direction: transition.stored,
        })
    }

    async fn viewer_votes(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> DiscussionResult<HashMap<Uuid, VoteDirection>> {
        let state = self.state.read().await;
        Ok(comment_ids
            .iter()
            .filter_map(|id| {
                state
                    .votes
                    .get(&(*id, user_id))
                    .map(|direction| (*id, *direction))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentSort, EntityKind};

    fn story() -> EntityKey {
        EntityKey::new(EntityKind::Story, Uuid::new_v4())
    }

    fn top_level(thread_id: Uuid, content: &str) -> NewComment {
        NewComment {
            thread_id,
            parent_id: None,
            author_id: Uuid::new_v4(),
            content: content.to_string(),
            depth: 0,
        }
    }

    #[tokio::test]
    async fn concurrent_get_or_create_yields_one_thread() {
        let store = InMemoryDiscussionStore::new();
        let key = story();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_or_create_thread(key).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.state.read().await.threads.len(), 1);
    }

    #[tokio::test]
    async fn locked_thread_rejects_insert() {
        let store = InMemoryDiscussionStore::new();
        let thread = store.get_or_create_thread(story()).await.unwrap();
        store.set_thread_locked(thread.id, true).await.unwrap();

        let result = store.insert_comment(top_level(thread.id, "hello")).await;
        assert_eq!(result.unwrap_err(), DiscussionError::ThreadLocked);
    }

    #[tokio::test]
    async fn concurrent_votes_by_one_user_never_double_count() {
        let store = InMemoryDiscussionStore::new();
        let thread = store.get_or_create_thread(story()).await.unwrap();
        let comment = store
            .insert_comment(top_level(thread.id, "hello"))
            .await
            .unwrap();
        let (comment_id, user) = (comment.id, Uuid::new_v4());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(
                    async move { store.apply_vote(comment_id, user, VoteDirection::Up).await },
                )
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Four toggles of the same direction cancel out pairwise.
        let stored = store.find_comment(comment_id).await.unwrap().unwrap();
        assert_eq!(stored.score, 0);
        assert_eq!(store.vote_count(comment_id).await, 0);
    }

    #[tokio::test]
    async fn mutators_skip_tombstones() {
        let store = InMemoryDiscussionStore::new();
        let thread = store.get_or_create_thread(story()).await.unwrap();
        let comment = store
            .insert_comment(top_level(thread.id, "hello"))
            .await
            .unwrap();

        let deleted = store.soft_delete_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(deleted.content, DELETED_CONTENT);

        assert!(store.soft_delete_comment(comment.id).await.unwrap().is_none());
        assert!(store.set_comment_pinned(comment.id, true).await.unwrap().is_none());
        assert!(
            store
                .update_comment_content(comment.id, "again")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store
                .apply_vote(comment.id, Uuid::new_v4(), VoteDirection::Up)
                .await
                .unwrap_err(),
            DiscussionError::CommentNotFound
        );
    }

    #[tokio::test]
    async fn list_pages_one_level() {
        let store = InMemoryDiscussionStore::new();
        let thread = store.get_or_create_thread(story()).await.unwrap();
        let first = store
            .insert_comment(top_level(thread.id, "first"))
            .await
            .unwrap();
        store
            .insert_comment(top_level(thread.id, "second"))
            .await
            .unwrap();
        store
            .insert_comment(NewComment {
                parent_id: Some(first.id),
                depth: 1,
                ..top_level(thread.id, "reply")
            })
            .await
            .unwrap();

        let mut filter = CommentFilter {
            thread_id: thread.id,
            parent_id: None,
            include_hidden: false,
            sort: CommentSort::New,
            limit: 1,
            offset: 0,
        };
        let page = store.list_comments(&filter).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "second");

        filter.offset = 1;
        let page = store.list_comments(&filter).await.unwrap();
        assert_eq!(page[0].content, "first");

        filter.parent_id = Some(first.id);
        filter.offset = 0;
        let replies = store.list_comments(&filter).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].depth, 1);
    }
}
