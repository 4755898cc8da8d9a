//! REST API module.
//!
//! Routes and handlers for the blog frontend. Bodies are JSON in camelCase;
//! failures use the error envelope from [`crate::errors`].

mod blogs;
mod engagement;
mod search;
mod users;

pub use blogs::*;
pub use engagement::*;
pub use search::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::Blog;
use crate::AppState;

/// Success response with an explicit status code.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: StatusCode,
    pub body: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// 200 with `body`.
pub fn ok<T: Serialize>(body: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status: StatusCode::OK,
        body,
    })
}

/// 201 with `body`.
pub fn created<T: Serialize>(body: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status: StatusCode::CREATED,
        body,
    })
}

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// `{"blog": …}`
#[derive(Debug, Serialize)]
pub struct BlogBody {
    pub blog: Blog,
}

/// Bring the search index in line with a post after a write.
///
/// The store is the source of truth, so index failures are logged and swallowed.
pub(crate) async fn reindex(state: &AppState, blog: &Blog) {
    if let Err(e) = state.search.index_blog(blog).await {
        tracing::warn!(blog_id = %blog.id, "Failed to update search index: {}", e);
    }
}

pub(crate) async fn unindex(state: &AppState, blog_id: &str) {
    if let Err(e) = state.search.remove_blog(blog_id).await {
        tracing::warn!(blog_id = %blog_id, "Failed to remove blog from search index: {}", e);
    }
}
