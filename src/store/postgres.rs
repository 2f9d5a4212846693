use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
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

const COMMENT_COLUMNS: &str = r#"
    id, thread_id, parent_id, author_id, content, depth, score,
    is_hidden, is_pinned, created_at, edited_at, deleted_at
"#;

#[derive(Clone)]
pub struct PgDiscussionStore {
    db: PgPool,
}

impl PgDiscussionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DiscussionStore for PgDiscussionStore {
    async fn find_thread(&self, thread_id: Uuid) -> DiscussionResult<Option<Thread>> {
        let thread =
            sqlx::query_as::<_, Thread>("SELECT * FROM discussion_threads WHERE id = $1")
                .bind(thread_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(thread)
    }

    async fn find_thread_by_entity(&self, key: EntityKey) -> DiscussionResult<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>(
            "SELECT * FROM discussion_threads WHERE entity_kind = $1 AND entity_id = $2",
        )
        .bind(key.kind)
        .bind(key.id)
        .fetch_optional(&self.db)
        .await?;

        Ok(thread)
    }

    async fn get_or_create_thread(&self, key: EntityKey) -> DiscussionResult<Thread> {
        if let Some(thread) = self.find_thread_by_entity(key).await? {
            return Ok(thread);
        }

        // Losing a creation race leaves RETURNING empty; the winner's row is
        // then visible to the re-fetch below.
        let inserted = sqlx::query_as::<_, Thread>(
            r#"
            INSERT INTO discussion_threads (id, entity_kind, entity_id, is_locked, created_at, updated_at)
            VALUES ($1, $2, $3, false, NOW(), NOW())
            ON CONFLICT (entity_kind, entity_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.kind)
        .bind(key.id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(thread) = inserted {
            tracing::debug!(thread_id = %thread.id, entity = %key.kind, "created discussion thread");
            return Ok(thread);
        }

        self.find_thread_by_entity(key).await?.ok_or_else(|| {
            DiscussionError::Internal("thread vanished after insert conflict".to_string())
        })
    }

    async fn set_thread_locked(
        &self,
        thread_id: Uuid,
        is_locked: bool,
    ) -> DiscussionResult<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>(
            r#"
            UPDATE discussion_threads
            SET is_locked = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(is_locked)
        .bind(thread_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(thread)
    }

    async fn insert_comment(&self, comment: NewComment) -> DiscussionResult<Comment> {
        // The lock check and the insert are one statement so a concurrent
        // LockThread cannot slip in between.
        let query = format!(
            r#"
            INSERT INTO discussion_comments (
                id, thread_id, parent_id, author_id, content, depth,
                score, is_hidden, is_pinned, created_at
            )
            SELECT $1, t.id, $3, $4, $5, $6, 0, false, false, NOW()
            FROM discussion_threads t
            WHERE t.id = $2 AND NOT t.is_locked
            RETURNING {COMMENT_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Comment>(&query)
            .bind(Uuid::new_v4())
            .bind(comment.thread_id)
            .bind(comment.parent_id)
            .bind(comment.author_id)
            .bind(&comment.content)
            .bind(comment.depth)
            .fetch_optional(&self.db)
            .await?;

        match inserted {
            Some(comment) => Ok(comment),
            None => match self.find_thread(comment.thread_id).await? {
                Some(_) => Err(DiscussionError::ThreadLocked),
                None => Err(DiscussionError::ThreadNotFound),
            },
        }
    }

    async fn find_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM discussion_comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> DiscussionResult<Option<Comment>> {
        let query = format!(
            r#"
            UPDATE discussion_comments
            SET content = $1, edited_at = NOW()
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(content)
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn soft_delete_comment(&self, comment_id: Uuid) -> DiscussionResult<Option<Comment>> {
        // Soft delete - keep the row so replies keep their parent
        let query = format!(
            r#"
            UPDATE discussion_comments
            SET deleted_at = NOW(), content = $1
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(DELETED_CONTENT)
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn set_comment_hidden(
        &self,
        comment_id: Uuid,
        is_hidden: bool,
    ) -> DiscussionResult<Option<Comment>> {
        let query = format!(
            r#"
            UPDATE discussion_comments
            SET is_hidden = $1
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(is_hidden)
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn set_comment_pinned(
        &self,
        comment_id: Uuid,
        is_pinned: bool,
    ) -> DiscussionResult<Option<Comment>> {
        let query = format!(
            r#"
            UPDATE discussion_comments
            SET is_pinned = $1
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(is_pinned)
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    async fn list_comments(&self, filter: &CommentFilter) -> DiscussionResult<Vec<Comment>> {
        // $2 is NULL for top-level listings
        let query = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM discussion_comments c
            WHERE c.thread_id = $1
              AND c.parent_id IS NOT DISTINCT FROM $2
              AND ($3 OR NOT c.is_hidden)
            ORDER BY {}
            LIMIT $4 OFFSET $5
            "#,
            query_service::order_clause(filter.sort)
        );

        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(filter.thread_id)
            .bind(filter.parent_id)
            .bind(filter.include_hidden)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.db)
            .await?;

        Ok(comments)
    }

    async fn apply_vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> DiscussionResult<VoteOutcome> {
        let mut tx = self.db.begin().await?;

        // Row lock on the comment serialises every vote on it until commit.
        let live = sqlx::query(
            "SELECT id FROM discussion_comments WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;

        if live.is_none() {
            return Err(DiscussionError::CommentNotFound);
        }

        let existing = sqlx::query(
            "SELECT direction FROM discussion_comment_votes WHERE comment_id = $1 AND user_id = $2",
        )
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| VoteDirection::try_from(row.get::<i16, _>("direction")))
        .transpose()
        .map_err(|e| DiscussionError::Internal(format!("corrupt vote row: {e}")))?;

        let transition = vote_service::resolve_vote(existing, direction);

        match transition.stored {
            Some(stored) => {
                sqlx::query(
                    r#"
                    INSERT INTO discussion_comment_votes (comment_id, user_id, direction, created_at, updated_at)
                    VALUES ($1, $2, $3, NOW(), NOW())
                    ON CONFLICT (comment_id, user_id)
                    DO UPDATE SET direction = EXCLUDED.direction, updated_at = NOW()
                    "#,
                )
                .bind(comment_id)
                .bind(user_id)
                .bind(i16::from(stored))
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM discussion_comment_votes WHERE comment_id = $1 AND user_id = $2",
                )
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let score: i32 = sqlx::query(
            "UPDATE discussion_comments SET score = score + $1 WHERE id = $2 RETURNING score",
        )
        .bind(transition.score_delta)
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?
        .get("score");

        tx.commit().await?;

        Ok(VoteOutcome {
            score,
            viewer_direction: transition.stored,
        })
    }

    async fn viewer_votes(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> DiscussionResult<HashMap<Uuid, VoteDirection>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT comment_id, direction
            FROM discussion_comment_votes
            WHERE user_id = $1 AND comment_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(comment_ids)
        .fetch_all(&self.db)
        .await?;

        let mut votes = HashMap::with_capacity(rows.len());
        for row in rows {
            let direction = VoteDirection::try_from(row.get::<i16, _>("direction"))
                .map_err(|e| DiscussionError::Internal(format!("corrupt vote row: {e}")))?;
            votes.insert(row.get::<Uuid, _>("comment_id"), direction);
        }

        Ok(votes)
    }
}
