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
    models::{
        CommentResponse, CommentSort, CreateCommentRequest, EntityKind, LockThreadRequest,
        ThreadRef, ThreadResponse,
    },
    services::query_service::ListComments,
};

#[derive(Debug, Deserialize)]
pub struct GetCommentsQuery {
    pub sort: Option<CommentSort>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Moderators see hidden comments unless they opt out.
    pub include_hidden: Option<bool>,
}

/// Hidden comments are only listed for viewers who may moderate the profile.
pub(crate) async fn include_hidden_for(
    state: &AppState,
    viewer_id: Option<Uuid>,
    profile_slug: &str,
    requested: Option<bool>,
) -> Result<bool> {
    let Some(viewer_id) = viewer_id else {
        return Ok(false);
    };
    if requested == Some(false) {
        return Ok(false);
    }

    Ok(state
        .discussions
        .can_moderate(viewer_id, profile_slug)
        .await?)
}

pub async fn get_discussion(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(EntityKind, String)>,
    Query(params): Query<GetCommentsQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Value>> {
    let (thread, entity) = state.discussions.open_discussion(kind, &slug).await?;

    let viewer_id = auth_user.user_id();
    let include_hidden =
        include_hidden_for(&state, viewer_id, &entity.profile_slug, params.include_hidden).await?;

    let comments = state
        .discussions
        .list_comments(
            thread.id,
            ListComments {
                parent_id: None,
                viewer_id,
                include_hidden,
                sort: params.sort.unwrap_or_default(),
                limit: params.limit,
                offset: params.offset,
            },
        )
        .await?;

    Ok(Json(json!({
        "thread": ThreadResponse::new(&thread, entity.profile_slug),
        "comments": comments
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((kind, slug)): Path<(EntityKind, String)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    payload.validate()?;

    let (thread, _) = state.discussions.open_discussion(kind, &slug).await?;

    let comment = state
        .discussions
        .create_comment(
            ThreadRef::Thread(thread.id),
            auth_user.user_id,
            None,
            &payload.content,
        )
        .await?;

    Ok(Json(comment))
}

pub async fn lock_thread(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(thread_id): Path<Uuid>,
    Json(payload): Json<LockThreadRequest>,
) -> Result<Json<ThreadResponse>> {
    payload.validate()?;

    let thread = state
        .discussions
        .lock_thread(
            thread_id,
            auth_user.user_id,
            &payload.profile_slug,
            payload.is_locked,
        )
        .await?;

    Ok(Json(ThreadResponse::new(&thread, payload.profile_slug)))
}
