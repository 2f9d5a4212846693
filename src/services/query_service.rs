use std::cmp::Ordering;

use uuid::Uuid;

use crate::{
    config::DiscussionLimits,
    error::{DiscussionError, DiscussionResult},
    models::{Comment, CommentFilter, CommentResponse, CommentSort},
    services::discussion_service::DiscussionService,
};

/// SQL ordering for a sort mode. Every variant ends on `id` so pages are
/// stable when timestamps collide.
pub fn order_clause(sort: CommentSort) -> &'static str {
    match sort {
        CommentSort::New => "c.created_at DESC, c.id ASC",
        CommentSort::Top => "c.score DESC, c.created_at ASC, c.id ASC",
        CommentSort::Hot => {
            "c.is_pinned DESC, CASE WHEN c.is_pinned THEN c.created_at END ASC, \
             c.score DESC, c.created_at ASC, c.id ASC"
        }
    }
}

/// In-process counterpart of [`order_clause`].
pub fn compare(sort: CommentSort, a: &Comment, b: &Comment) -> Ordering {
    let by_top = |a: &Comment, b: &Comment| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.created_at.cmp(&b.created_at))
    };

    let ordering = match sort {
        CommentSort::New => b.created_at.cmp(&a.created_at),
        CommentSort::Top => by_top(a, b),
        CommentSort::Hot => match (a.is_pinned, b.is_pinned) {
            (true, true) => a.created_at.cmp(&b.created_at),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => by_top(a, b),
        },
    };

    ordering.then_with(|| a.id.cmp(&b.id))
}

/// Applies the default page size and clamps to the maximum.
pub fn page_bounds(limit: Option<u32>, offset: Option<u32>, limits: &DiscussionLimits) -> (i64, i64) {
    let limit = limit
        .unwrap_or(limits.default_page_size)
        .clamp(1, limits.max_page_size.max(1));
    (i64::from(limit), i64::from(offset.unwrap_or(0)))
}

/// Parameters of one `list_comments` call.
#[derive(Debug, Clone, Default)]
pub struct ListComments {
    pub parent_id: Option<Uuid>,
    pub viewer_id: Option<Uuid>,
    /// Decided by the caller from the viewer's moderation standing.
    pub include_hidden: bool,
    pub sort: CommentSort,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DiscussionService {
    /// Lists one level of a thread: top-level comments, or direct children of
    /// `parent_id`. Tombstones stay in the listing so the tree keeps its shape.
    pub async fn list_comments(
        &self,
        thread_id: Uuid,
        request: ListComments,
    ) -> DiscussionResult<Vec<CommentResponse>> {
        if let Some(parent_id) = request.parent_id {
            let parent = self
                .store
                .find_comment(parent_id)
                .await?
                .ok_or(DiscussionError::CommentNotFound)?;
            if parent.thread_id != thread_id {
                return Err(DiscussionError::CommentNotFound);
            }
        } else if self.store.find_thread(thread_id).await?.is_none() {
            return Err(DiscussionError::ThreadNotFound);
        }

        let (limit, offset) = page_bounds(request.limit, request.offset, &self.limits);
        let filter = CommentFilter {
            thread_id,
            parent_id: request.parent_id,
            include_hidden: request.include_hidden,
            sort: request.sort,
            limit,
            offset,
        };

        let comments = self.store.list_comments(&filter).await?;
        self.with_viewer_votes(comments, request.viewer_id).await
    }

    pub(crate) async fn with_viewer_votes(
        &self,
        comments: Vec<Comment>,
        viewer_id: Option<Uuid>,
    ) -> DiscussionResult<Vec<CommentResponse>> {
        let votes = match viewer_id {
            Some(viewer_id) => {
                let ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
                self.store.viewer_votes(viewer_id, &ids).await?
            }
            None => Default::default(),
        };

        Ok(comments
            .into_iter()
            .map(|comment| {
                let viewer_vote = votes.get(&comment.id).map(|d| i16::from(*d));
                CommentResponse::new(comment, viewer_vote)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn comment(score: i32, age_minutes: i64, is_pinned: bool) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            thread_id: Uuid::nil(),
            parent_id: None,
            author_id: Uuid::new_v4(),
            content: format!("score {score}"),
            depth: 0,
            score,
            is_hidden: false,
            is_pinned,
            created_at: Utc::now() - Duration::minutes(age_minutes),
            edited_at: None,
            deleted_at: None,
        }
    }

    fn sorted(sort: CommentSort, mut comments: Vec<Comment>) -> Vec<String> {
        comments.sort_by(|a, b| compare(sort, a, b));
        comments.into_iter().map(|c| c.content).collect()
    }

    #[test]
    fn new_is_newest_first() {
        let order = sorted(
            CommentSort::New,
            vec![comment(1, 30, false), comment(2, 10, false), comment(3, 20, false)],
        );
        assert_eq!(order, ["score 2", "score 3", "score 1"]);
    }

    #[test]
    fn top_breaks_ties_with_older_first() {
        let older = comment(5, 60, false);
        let newer = comment(5, 5, false);
        let best = comment(9, 1, false);
        let older_id = older.id;

        for _ in 0..3 {
            let mut comments = vec![newer.clone(), best.clone(), older.clone()];
            comments.sort_by(|a, b| compare(CommentSort::Top, a, b));
            assert_eq!(comments[0].score, 9);
            assert_eq!(comments[1].id, older_id);
        }
    }

    #[test]
    fn hot_puts_pinned_first_oldest_pin_leading() {
        let mut late_pin = comment(0, 5, true);
        late_pin.content = "late pin".into();
        let mut early_pin = comment(-3, 50, true);
        early_pin.content = "early pin".into();

        let order = sorted(
            CommentSort::Hot,
            vec![comment(10, 1, false), late_pin, comment(2, 2, false), early_pin],
        );
        assert_eq!(order, ["early pin", "late pin", "score 10", "score 2"]);
    }

    #[test]
    fn page_bounds_default_and_clamp() {
        let limits = DiscussionLimits::default();
        assert_eq!(page_bounds(None, None, &limits), (50, 0));
        assert_eq!(page_bounds(Some(10_000), Some(7), &limits), (200, 7));
        assert_eq!(page_bounds(Some(0), None, &limits), (1, 0));
    }
}
