//! Blog post endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use super::{created, ok, reindex, unindex, ApiResult, BlogBody, SuccessBody};
use crate::errors::AppError;
use crate::models::{
    Blog, CreateBlogRequest, DeleteBlogRequest, UpdateBlogRequest, ViewRequest,
};
use crate::AppState;

/// Query parameters of GET /api/blogs.
#[derive(Debug, Deserialize)]
pub struct BlogsQuery {
    pub id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BlogsResponse {
    One { blog: Blog },
    Many { blogs: Vec<Blog> },
}

#[derive(Debug, Serialize)]
pub struct CreatedBody {
    pub id: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdatedBody {
    pub success: bool,
    pub blog: Blog,
}

/// GET /api/blogs - One post by `id`, or the newest posts up to `limit`.
pub async fn get_blogs(
    State(state): State<AppState>,
    query: Result<Query<BlogsQuery>, QueryRejection>,
) -> ApiResult<BlogsResponse> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Some(id) = query.id.filter(|id| !id.trim().is_empty()) {
        let blog = state
            .repo
            .get_blog(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blog {} not found", id)))?;
        return ok(BlogsResponse::One { blog });
    }

    let limit = query
        .limit
        .unwrap_or(state.config.default_list_limit)
        .clamp(1, state.config.max_list_limit);

    let blogs = state.repo.list_blogs(limit).await?;
    ok(BlogsResponse::Many { blogs })
}

/// POST /api/blogs - Publish a post.
pub async fn create_blog(
    State(state): State<AppState>,
    payload: Result<Json<CreateBlogRequest>, JsonRejection>,
) -> ApiResult<CreatedBody> {
    let Json(request) = payload?;
    request.validate()?;

    let blog = state.repo.create_blog(&request).await?;
    reindex(&state, &blog).await;

    created(CreatedBody {
        id: blog.id,
        success: true,
    })
}

/// POST /api/blogs/update - Replace a post's description (author only).
pub async fn update_blog(
    State(state): State<AppState>,
    payload: Result<Json<UpdateBlogRequest>, JsonRejection>,
) -> ApiResult<UpdatedBody> {
    let Json(request) = payload?;
    request.validate()?;

    let blog = state
        .repo
        .update_description(&request.blog_id, &request.user_email, &request.description)
        .await?;
    reindex(&state, &blog).await;

    ok(UpdatedBody {
        success: true,
        blog,
    })
}

/// POST /api/blogs/delete - Delete a post (author only).
pub async fn delete_blog(
    State(state): State<AppState>,
    payload: Result<Json<DeleteBlogRequest>, JsonRejection>,
) -> ApiResult<SuccessBody> {
    let Json(request) = payload?;
    request.validate()?;

    let blog = state
        .repo
        .delete_blog(&request.blog_id, &request.user_email)
        .await?;
    unindex(&state, &blog.id).await;

    ok(SuccessBody { success: true })
}

/// POST /api/blogs/view - Count a view.
pub async fn view_blog(
    State(state): State<AppState>,
    payload: Result<Json<ViewRequest>, JsonRejection>,
) -> ApiResult<BlogBody> {
    let Json(request) = payload?;
    request.validate()?;

    let blog = state.repo.record_view(&request.blog_id).await?;
    ok(BlogBody { blog })
}
