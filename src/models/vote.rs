use serde::{Deserialize, Serialize};

use crate::error::DiscussionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i32 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl TryFrom<i16> for VoteDirection {
    type Error = DiscussionError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(DiscussionError::InvalidVoteDirection(other)),
        }
    }
}

impl From<VoteDirection> for i16 {
    fn from(direction: VoteDirection) -> Self {
        match direction {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Result of one vote mutation, as committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub score: i32,
    pub viewer_direction: Option<VoteDirection>,
}

// Vote request
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: i16, // -1 for downvote, 1 for upvote; repeating a vote removes it
}

// Vote response
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub score: i32,
    pub viewer_direction: Option<i16>,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            score: outcome.score,
            viewer_direction: outcome.viewer_direction.map(i16::from),
        }
    }
}
