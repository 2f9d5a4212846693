use uuid::Uuid;

use crate::{
    error::DiscussionResult,
    models::{VoteDirection, VoteOutcome},
    services::discussion_service::DiscussionService,
};

/// What a single vote request does to the stored row and the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    /// Direction stored after the request; `None` means the row is removed.
    pub stored: Option<VoteDirection>,
    pub score_delta: i32,
}

/// The toggle law: a first vote is recorded, repeating it withdraws it, and
/// the opposite direction replaces it.
pub fn resolve_vote(existing: Option<VoteDirection>, requested: VoteDirection) -> VoteTransition {
    match existing {
        None => VoteTransition {
            stored: Some(requested),
            score_delta: requested.value(),
        },
        Some(current) if current == requested => VoteTransition {
            stored: None,
            score_delta: -current.value(),
        },
        Some(current) => VoteTransition {
            stored: Some(requested),
            score_delta: requested.value() - current.value(),
        },
    }
}

impl DiscussionService {
    pub async fn vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        direction: i16,
    ) -> DiscussionResult<VoteOutcome> {
        let direction = VoteDirection::try_from(direction)?;
        let outcome = self.store.apply_vote(comment_id, user_id, direction).await?;

        tracing::debug!(
            %comment_id,
            %user_id,
            score = outcome.score,
            "vote applied"
        );

        Ok(outcome)
    }
}
