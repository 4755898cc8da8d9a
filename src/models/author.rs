//! Per-author aggregate records.

use serde::{Deserialize, Serialize};

/// Denormalized like/dislike totals across all posts of one author.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorAggregate {
    pub author_key: String,
    pub total_likes: i64,
    pub total_dislikes: i64,
}

/// Response body for GET /api/userstats.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_views: i64,
    pub total_likes: i64,
    pub total_dislikes: i64,
}

/// Query string carrying an author email.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}
