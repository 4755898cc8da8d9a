//! Blog post model and the request bodies of the blog endpoints.

use serde::{Deserialize, Serialize};

use super::require;
use crate::errors::AppError;
use crate::ledger::ReactionKind;

/// A comment appended to a blog post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    /// Display name of the commenter
    pub author: String,
    /// Stable identifier of the commenter
    pub author_key: String,
    pub reactor_email: String,
    pub posted_at_millis: i64,
}

/// A published blog article with its engagement metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub username: String,
    /// Author key of the post: the author's stable email
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub tags: Vec<String>,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    pub likes: i64,
    pub dislikes: i64,
    pub views: i64,
    pub comments: Vec<Comment>,
    pub created_at_millis: i64,
    /// Compare-and-swap token for engagement writes, never sent to clients
    #[serde(default, skip_serializing)]
    pub version: i64,
}

impl Blog {
    pub fn author_key(&self) -> &str {
        &self.email
    }

    pub fn is_authored_by(&self, requester: &str) -> bool {
        self.email == requester
    }
}

/// Request body for POST /api/blogs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CreateBlogRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.title, "title")?;
        require(&self.description, "description")?;
        require(&self.username, "username")?;
        require(&self.email, "email")
    }

    /// Tags trimmed, blank entries dropped, duplicates removed in first-seen order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

/// Request body for POST /api/blogs/like and /api/blogs/dislike.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    #[serde(default)]
    pub blog_id: String,
    /// The reacting user
    #[serde(default)]
    pub user_email: String,
    /// Author key of the post being reacted to
    #[serde(default, rename = "emailby")]
    pub author_key: String,
}

impl ReactionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.blog_id, "blogId")?;
        require(&self.user_email, "userEmail")?;
        require(&self.author_key, "emailby")
    }
}

/// A validated reaction ready for the ledger.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub blog_id: String,
    pub reactor: String,
    pub author_key: String,
    pub kind: ReactionKind,
}

impl ReactionRequest {
    pub fn into_reaction(self, kind: ReactionKind) -> Result<Reaction, AppError> {
        self.validate()?;
        Ok(Reaction {
            blog_id: self.blog_id,
            reactor: self.user_email,
            author_key: self.author_key,
            kind,
        })
    }
}

/// Request body for POST /api/blogs/comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub blog_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_id: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.blog_id, "blogId")?;
        require(&self.comment, "comment")?;
        require(&self.username, "username")?;
        require(&self.email, "email")?;
        require(&self.user_id, "userId")
    }
}

/// Request body for POST /api/blogs/update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    #[serde(default)]
    pub blog_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_email: String,
}

impl UpdateBlogRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.blog_id, "blogId")?;
        require(&self.description, "description")?;
        require(&self.user_email, "userEmail")
    }
}

/// Request body for POST /api/blogs/delete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBlogRequest {
    #[serde(default)]
    pub blog_id: String,
    #[serde(default)]
    pub user_email: String,
}

impl DeleteBlogRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.blog_id, "blogId")?;
        require(&self.user_email, "userEmail")
    }
}

/// Request body for POST /api/blogs/view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    #[serde(default)]
    pub blog_id: String,
}

impl ViewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.blog_id, "blogId")
    }
}
