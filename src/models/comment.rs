use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Content shown in place of a soft-deleted comment.
pub const DELETED_CONTENT: &str = "[deleted]";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub depth: i32,
    pub score: i32,
    pub is_hidden: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A validated comment ready to be stored. Depth is computed by the service.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub thread_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub depth: i32,
}

// Comment sorting options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    /// Pinned first, then by score.
    #[default]
    #[serde(alias = "default")]
    Hot,
    Top,
    New,
}

/// A single page request against one level of a thread's tree.
#[derive(Debug, Clone)]
pub struct CommentFilter {
    pub thread_id: Uuid,
    /// `None` lists top-level comments, otherwise direct children of this comment.
    pub parent_id: Option<Uuid>,
    pub include_hidden: bool,
    pub sort: CommentSort,
    pub limit: i64,
    pub offset: i64,
}

// Create comment request. The configured content bounds are enforced by the
// discussion service; this only turns away oversized bodies.
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(max = 20000))]
    pub content: String,
}

// Update comment request
#[derive(Debug, Validate, Deserialize)]
pub struct UpdateCommentRequest {
    #[validate(length(max = 20000))]
    pub content: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct HideCommentRequest {
    #[validate(length(min = 1, max = 100))]
    pub profile_slug: String,
    pub is_hidden: bool,
}

#[derive(Debug, Validate, Deserialize)]
pub struct PinCommentRequest {
    #[validate(length(min = 1, max = 100))]
    pub profile_slug: String,
    pub is_pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub depth: i32,
    pub score: i32,
    pub is_hidden: bool,
    pub is_pinned: bool,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub viewer_vote: Option<i16>,
}

impl CommentResponse {
    pub fn new(comment: Comment, viewer_vote: Option<i16>) -> Self {
        let is_deleted = comment.is_deleted();
        Self {
            id: comment.id,
            thread_id: comment.thread_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            content: if is_deleted {
                DELETED_CONTENT.to_string()
            } else {
                comment.content
            },
            depth: comment.depth,
            score: comment.score,
            is_hidden: comment.is_hidden,
            is_pinned: comment.is_pinned,
            is_edited: comment.edited_at.is_some(),
            is_deleted,
            created_at: comment.created_at,
            edited_at: comment.edited_at,
            viewer_vote,
        }
    }
}
