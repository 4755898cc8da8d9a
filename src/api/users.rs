//! Per-author endpoints and username records.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;

use super::{ok, ApiResult, SuccessBody};
use crate::errors::AppError;
use crate::models::{Blog, EmailQuery, SetUsernameRequest, UserStats};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserBlogsBody {
    pub blogs: Vec<Blog>,
}

fn required_email(query: Result<Query<EmailQuery>, QueryRejection>) -> Result<String, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    query
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| AppError::Validation("email is required".to_string()))
}

/// GET /api/userstats - View, like and dislike totals of an author.
pub async fn user_stats(
    State(state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ApiResult<UserStats> {
    let email = required_email(query)?;
    ok(state.repo.user_stats(&email).await?)
}

/// GET /api/userblogs - Posts of an author, newest first.
pub async fn user_blogs(
    State(state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ApiResult<UserBlogsBody> {
    let email = required_email(query)?;
    let blogs = state.repo.list_user_blogs(&email).await?;
    ok(UserBlogsBody { blogs })
}

/// GET /api/user/{email} - Username of a user.
pub async fn get_username(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<String> {
    let username = state
        .repo
        .get_username(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No username recorded for {}", email)))?;
    ok(username)
}

/// POST /api/user/{email} - Set the username of a user.
pub async fn set_username(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: Result<Json<SetUsernameRequest>, JsonRejection>,
) -> ApiResult<String> {
    let Json(request) = payload?;
    request.validate(&email)?;

    let username = state.repo.set_username(&email, request.username.trim()).await?;
    tracing::info!(email = %email, "Username set");
    ok(username)
}

/// DELETE /api/user/{email} - Remove the username record.
pub async fn delete_username(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<SuccessBody> {
    let removed = state.repo.delete_username(&email).await?;
    tracing::debug!(email = %email, removed, "Username record deleted");
    ok(SuccessBody { success: true })
}
