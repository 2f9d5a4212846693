use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::Result,
    handlers::discussions::{GetCommentsQuery, include_hidden_for},
    models::{
        CommentResponse, CreateCommentRequest, HideCommentRequest, PinCommentRequest, ThreadRef,
        UpdateCommentRequest, VoteRequest, VoteResponse,
    },
    services::query_service::ListComments,
};

#[derive(Debug, Deserialize)]
pub struct GetCommentQuery {
    pub locale: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct DeleteCommentQuery {
    #[validate(length(min = 1, max = 100))]
    pub profile: String,
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<GetCommentQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<CommentResponse>> {
    let comment = state
        .discussions
        .get_comment(comment_id, params.locale.as_deref(), auth_user.user_id())
        .await?;

    Ok(Json(comment))
}

pub async fn get_comment_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<GetCommentsQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Value>> {
    let thread = state.discussions.thread_of_comment(comment_id).await?;
    let profile_slug = state.discussions.owning_profile(&thread).await?;

    let viewer_id = auth_user.user_id();
    let include_hidden =
        include_hidden_for(&state, viewer_id, &profile_slug, params.include_hidden).await?;

    let replies = state
        .discussions
        .list_comments(
            thread.id,
            ListComments {
                parent_id: Some(comment_id),
                viewer_id,
                include_hidden,
                sort: params.sort.unwrap_or_default(),
                limit: params.limit,
                offset: params.offset,
            },
        )
        .await?;

    Ok(Json(json!({
        "replies": replies,
        "parent_id": comment_id
    })))
}

pub async fn create_reply(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(parent_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    payload.validate()?;

    let thread = state.discussions.thread_of_comment(parent_id).await?;

    let comment = state
        .discussions
        .create_comment(
            ThreadRef::Thread(thread.id),
            auth_user.user_id,
            Some(parent_id),
            &payload.content,
        )
        .await?;

    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    payload.validate()?;

    let comment = state
        .discussions
        .edit_comment(comment_id, auth_user.user_id, &payload.content)
        .await?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<DeleteCommentQuery>,
) -> Result<Json<Value>> {
    params.validate()?;

    state
        .discussions
        .delete_comment(comment_id, auth_user.user_id, &params.profile)
        .await?;

    Ok(Json(json!({
        "message": "Comment deleted successfully"
    })))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let outcome = state
        .discussions
        .vote(comment_id, auth_user.user_id, payload.direction)
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn hide_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<HideCommentRequest>,
) -> Result<Json<CommentResponse>> {
    payload.validate()?;

    let comment = state
        .discussions
        .hide_comment(
            comment_id,
            auth_user.user_id,
            &payload.profile_slug,
            payload.is_hidden,
        )
        .await?;

    Ok(Json(comment))
}

pub async fn pin_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<PinCommentRequest>,
) -> Result<Json<CommentResponse>> {
    payload.validate()?;

    let comment = state
        .discussions
        .pin_comment(
            comment_id,
            auth_user.user_id,
            &payload.profile_slug,
            payload.is_pinned,
        )
        .await?;

    Ok(Json(comment))
}
