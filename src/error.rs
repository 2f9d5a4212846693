use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the discussion engine. Storage faults never leak
/// through; they are logged and collapsed into `Internal`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscussionError {
    #[error("Discussions are not enabled for this profile")]
    DiscussionsNotEnabled,

    #[error("Entity not found")]
    EntityNotFound,

    #[error("Thread not found")]
    ThreadNotFound,

    #[error("Thread is locked")]
    ThreadLocked,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("Comment must be at least {min} characters")]
    ContentTooShort { min: usize },

    #[error("Comment must be at most {max} characters")]
    ContentTooLong { max: usize },

    #[error("Replies cannot be nested deeper than {max} levels")]
    MaxNestingDepth { max: i32 },

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Invalid vote direction: {0}")]
    InvalidVoteDirection(i16),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiscussionError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DiscussionError::DiscussionsNotEnabled => "discussions_not_enabled",
            DiscussionError::EntityNotFound => "entity_not_found",
            DiscussionError::ThreadNotFound => "thread_not_found",
            DiscussionError::ThreadLocked => "thread_locked",
            DiscussionError::CommentNotFound => "comment_not_found",
            DiscussionError::ContentTooShort { .. } => "content_too_short",
            DiscussionError::ContentTooLong { .. } => "content_too_long",
            DiscussionError::MaxNestingDepth { .. } => "max_nesting_depth",
            DiscussionError::InsufficientPermission => "insufficient_permission",
            DiscussionError::InvalidVoteDirection(_) => "invalid_vote_direction",
            DiscussionError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DiscussionError::DiscussionsNotEnabled
            | DiscussionError::EntityNotFound
            | DiscussionError::ThreadNotFound
            | DiscussionError::CommentNotFound => StatusCode::NOT_FOUND,
            DiscussionError::ThreadLocked => StatusCode::LOCKED,
            DiscussionError::ContentTooShort { .. }
            | DiscussionError::ContentTooLong { .. }
            | DiscussionError::MaxNestingDepth { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DiscussionError::InvalidVoteDirection(_) => StatusCode::BAD_REQUEST,
            DiscussionError::InsufficientPermission => StatusCode::FORBIDDEN,
            DiscussionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for DiscussionError {
    fn from(error: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", error);
        DiscussionError::Internal("storage failure".to_string())
    }
}

pub type DiscussionResult<T> = std::result::Result<T, DiscussionError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Discussion(#[from] DiscussionError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message) = match self {
            AppError::Discussion(ref e) => {
                if let DiscussionError::Internal(message) = e {
                    tracing::error!("Discussion engine failure: {}", message);
                    (e.status(), e.kind(), "Internal server error".to_string())
                } else {
                    (e.status(), e.kind(), e.to_string())
                }
            }
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, "validation", message),
            AppError::Authentication(message) => {
                (StatusCode::UNAUTHORIZED, "authentication", message)
            }
            AppError::Jwt(ref e) => {
                tracing::debug!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "authentication",
                    "Invalid token".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Validation helper
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let error_messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();

        AppError::Validation(error_messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_distinct_statuses() {
        let locked = AppError::from(DiscussionError::ThreadLocked).into_response();
        assert_eq!(locked.status(), StatusCode::LOCKED);

        let forbidden = AppError::from(DiscussionError::InsufficientPermission).into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let too_deep = AppError::from(DiscussionError::MaxNestingDepth { max: 8 }).into_response();
        assert_eq!(too_deep.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn storage_errors_become_internal() {
        let error = DiscussionError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.kind(), "internal");
    }
}
