//! Search API endpoints.

use axum::extract::{rejection::QueryRejection, Query, State};
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::errors::AppError;
use crate::models::Blog;
use crate::search::{SearchQuery, MAX_SEARCH_OFFSET};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
    /// Only posts carrying this tag.
    pub tag: Option<String>,
    /// Only posts by this author username.
    pub author: Option<String>,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub blog: Blog,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over posts.
pub async fn search_blogs(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<SearchResponse> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);
    if params.offset > MAX_SEARCH_OFFSET {
        return Err(AppError::Validation(format!(
            "offset must be at most {}",
            MAX_SEARCH_OFFSET
        )));
    }

    let page = state.search.search(&SearchQuery {
        text: params.q,
        tag: params.tag,
        author: params.author,
        limit,
        offset: params.offset,
    })?;

    // The index can briefly lag a delete; hits without a post are dropped.
    let mut results = Vec::with_capacity(page.results.len());
    for hit in page.results {
        if let Some(blog) = state.repo.get_blog(&hit.blog_id).await? {
            results.push(SearchResultItem {
                blog,
                score: hit.score,
            });
        }
    }

    ok(SearchResponse {
        results,
        total: page.total,
        limit,
        offset: params.offset,
    })
}
