//! Reaction and comment endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use super::{ok, ApiResult, BlogBody};
use crate::ledger::ReactionKind;
use crate::models::{CommentRequest, ReactionRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

/// POST /api/blogs/like - Toggle a like.
pub async fn like_blog(
    State(state): State<AppState>,
    payload: Result<Json<ReactionRequest>, JsonRejection>,
) -> ApiResult<BlogBody> {
    react(state, payload, ReactionKind::Like).await
}

/// POST /api/blogs/dislike - Toggle a dislike.
pub async fn dislike_blog(
    State(state): State<AppState>,
    payload: Result<Json<ReactionRequest>, JsonRejection>,
) -> ApiResult<BlogBody> {
    react(state, payload, ReactionKind::Dislike).await
}

async fn react(
    state: AppState,
    payload: Result<Json<ReactionRequest>, JsonRejection>,
    kind: ReactionKind,
) -> ApiResult<BlogBody> {
    let Json(request) = payload?;
    let reaction = request.into_reaction(kind)?;

    let blog = state.repo.apply_reaction(&reaction).await?;
    ok(BlogBody { blog })
}

/// POST /api/blogs/comment - Append a comment.
pub async fn comment_blog(
    State(state): State<AppState>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<MessageBody> {
    let Json(request) = payload?;
    request.validate()?;

    state.repo.add_comment(&request).await?;
    ok(MessageBody {
        message: "Comment added".to_string(),
    })
}
