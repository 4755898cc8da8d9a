//! Database repository for blog, engagement and user records.
//!
//! Multi-record writes (post + author aggregate + author index) run in one
//! transaction. Engagement writes are compare-and-swap on the post's `version`.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::ledger::{self, AggregateDelta, Engagement};
use crate::models::{
    AuthorAggregate, Blog, Comment, CommentRequest, CreateBlogRequest, Reaction, UserStats,
};

const BLOG_COLUMNS: &str = "b.id, b.title, b.description, b.username, b.email, b.user_id, \
     b.tags, b.liked_by, b.disliked_by, b.likes, b.dislikes, b.views, b.created_at, b.version";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    reaction_attempts: u32,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            reaction_attempts: 3,
        }
    }

    /// Number of compare-and-swap attempts for engagement writes.
    pub fn with_reaction_attempts(mut self, attempts: u32) -> Self {
        self.reaction_attempts = attempts.max(1);
        self
    }

    // ==================== BLOG OPERATIONS ====================

    /// List blogs, newest first.
    pub async fn list_blogs(&self, limit: usize) -> Result<Vec<Blog>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM blogs b ORDER BY b.created_at DESC, b.rowid DESC LIMIT ?",
            BLOG_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Every blog in the store, used to rebuild the search index.
    pub async fn all_blogs(&self) -> Result<Vec<Blog>, AppError> {
        self.list_blogs(usize::MAX).await
    }

    /// Get a blog by ID, comments included.
    pub async fn get_blog(&self, id: &str) -> Result<Option<Blog>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM blogs b WHERE b.id = ?", BLOG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let comments = self.comments_for(id).await?;
                Ok(Some(blog_from_row(&row, comments)))
            }
            None => Ok(None),
        }
    }

    /// Create a blog, registering it in the author's index and creating the
    /// author aggregate on the author's first post.
    pub async fn create_blog(&self, request: &CreateBlogRequest) -> Result<Blog, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let tags = request.normalized_tags();
        let tags_json = serde_json::to_string(&tags)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO blogs (id, title, description, username, email, user_id, tags, created_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.user_id)
        .bind(&tags_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        ensure_aggregate(&mut tx, &request.email).await?;

        sqlx::query("INSERT OR IGNORE INTO user_blog_index (email, blog_id, created_at) VALUES (?, ?, ?)")
            .bind(&request.email)
            .bind(&id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(blog_id = %id, author = %request.email, "Blog created");

        Ok(Blog {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            user_id: request.user_id.clone(),
            tags,
            liked_by: Vec::new(),
            disliked_by: Vec::new(),
            likes: 0,
            dislikes: 0,
            views: 0,
            comments: Vec::new(),
            created_at_millis: now,
            version: 1,
        })
    }

    /// Replace the description of a blog. Only its author may do so.
    pub async fn update_description(
        &self,
        id: &str,
        requester: &str,
        description: &str,
    ) -> Result<Blog, AppError> {
        let existing = self
            .get_blog(id)
            .await?
            .ok_or_else(|| blog_not_found(id))?;

        if !existing.is_authored_by(requester) {
            return Err(AppError::Unauthorized(
                "Only the author may edit this blog".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE blogs SET description = ? WHERE id = ?")
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(blog_not_found(id));
        }

        self.get_blog(id).await?.ok_or_else(|| blog_not_found(id))
    }

    /// Delete a blog. Only its author may do so.
    ///
    /// Subtracts the post's counters from the author aggregate, removes the
    /// author index entry, then removes the post, all in one transaction.
    /// Returns the post as it was when deleted.
    pub async fn delete_blog(&self, id: &str, requester: &str) -> Result<Blog, AppError> {
        for attempt in 1..=self.reaction_attempts {
            let blog = self
                .get_blog(id)
                .await?
                .ok_or_else(|| blog_not_found(id))?;

            if !blog.is_authored_by(requester) {
                return Err(AppError::Unauthorized(
                    "Only the author may delete this blog".to_string(),
                ));
            }

            let delta = ledger::deletion_delta(&blog);
            let mut tx = self.pool.begin().await?;

            charge_aggregate(&mut tx, blog.author_key(), delta).await?;

            sqlx::query("DELETE FROM user_blog_index WHERE email = ? AND blog_id = ?")
                .bind(blog.author_key())
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM blog_comments WHERE blog_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            let result = sqlx::query("DELETE FROM blogs WHERE id = ? AND version = ?")
                .bind(id)
                .bind(blog.version)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                tracing::warn!(blog_id = %id, attempt, "Blog changed during delete, retrying");
                continue;
            }

            tx.commit().await?;
            tracing::info!(
                blog_id = %id,
                author = %blog.email,
                likes = blog.likes,
                dislikes = blog.dislikes,
                "Blog deleted"
            );
            return Ok(blog);
        }

        Err(AppError::Conflict(format!(
            "Blog {} kept changing while being deleted",
            id
        )))
    }

    /// Count one view of a blog.
    pub async fn record_view(&self, id: &str) -> Result<Blog, AppError> {
        let result = sqlx::query("UPDATE blogs SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(blog_not_found(id));
        }

        self.get_blog(id).await?.ok_or_else(|| blog_not_found(id))
    }

    // ==================== ENGAGEMENT OPERATIONS ====================

    /// Apply a like or dislike toggle and return the post's new state.
    ///
    /// The aggregate charge and the post write commit together. If another
    /// reaction lands between the read and the write, the transaction is rolled
    /// back and the toggle is recomputed from fresh state.
    pub async fn apply_reaction(&self, reaction: &Reaction) -> Result<Blog, AppError> {
        for attempt in 1..=self.reaction_attempts {
            let (author_key, engagement, version) = self
                .load_engagement(&reaction.blog_id)
                .await?
                .ok_or_else(|| blog_not_found(&reaction.blog_id))?;

            if author_key != reaction.author_key {
                return Err(AppError::Validation(format!(
                    "Blog {} is not authored by {}",
                    reaction.blog_id, reaction.author_key
                )));
            }

            let outcome = ledger::apply_reaction(&engagement, &reaction.reactor, reaction.kind);
            let next = &outcome.engagement;

            let mut tx = self.pool.begin().await?;

            charge_aggregate(&mut tx, &author_key, outcome.delta).await?;

            let result = sqlx::query(
                "UPDATE blogs SET liked_by = ?, disliked_by = ?, likes = ?, dislikes = ?, version = version + 1 WHERE id = ? AND version = ?"
            )
            .bind(serde_json::to_string(&next.liked_by)?)
            .bind(serde_json::to_string(&next.disliked_by)?)
            .bind(next.likes)
            .bind(next.dislikes)
            .bind(&reaction.blog_id)
            .bind(version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                tracing::warn!(
                    blog_id = %reaction.blog_id,
                    attempt,
                    "Concurrent engagement change detected, retrying"
                );
                continue;
            }

            tx.commit().await?;

            tracing::debug!(
                blog_id = %reaction.blog_id,
                reactor = %reaction.reactor,
                kind = reaction.kind.as_str(),
                effect = ?outcome.effect,
                delta_likes = outcome.delta.likes,
                delta_dislikes = outcome.delta.dislikes,
                "Reaction applied"
            );

            return self
                .get_blog(&reaction.blog_id)
                .await?
                .ok_or_else(|| blog_not_found(&reaction.blog_id));
        }

        Err(AppError::Conflict(format!(
            "Blog {} is being reacted to concurrently, try again",
            reaction.blog_id
        )))
    }

    /// Append a comment to a blog.
    pub async fn add_comment(&self, request: &CommentRequest) -> Result<Comment, AppError> {
        let now = Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"INSERT INTO blog_comments (blog_id, text, author, author_key, reactor_email, posted_at)
               SELECT ?, ?, ?, ?, ?, ?
               WHERE EXISTS (SELECT 1 FROM blogs WHERE id = ?)"#,
        )
        .bind(&request.blog_id)
        .bind(&request.comment)
        .bind(&request.username)
        .bind(&request.user_id)
        .bind(&request.email)
        .bind(now)
        .bind(&request.blog_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(blog_not_found(&request.blog_id));
        }

        Ok(Comment {
            text: request.comment.clone(),
            author: request.username.clone(),
            author_key: request.user_id.clone(),
            reactor_email: request.email.clone(),
            posted_at_millis: now,
        })
    }

    // ==================== AUTHOR OPERATIONS ====================

    /// Get the aggregate record of an author.
    pub async fn get_aggregate(&self, email: &str) -> Result<Option<AuthorAggregate>, AppError> {
        let row = sqlx::query(
            "SELECT email, total_likes, total_dislikes FROM user_blogs WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| AuthorAggregate {
            author_key: row.get("email"),
            total_likes: row.get("total_likes"),
            total_dislikes: row.get("total_dislikes"),
        }))
    }

    /// Like/dislike totals from the aggregate, views summed over the author's posts.
    pub async fn user_stats(&self, email: &str) -> Result<UserStats, AppError> {
        let aggregate = self.get_aggregate(email).await?.unwrap_or_default();

        let row = sqlx::query(
            r#"SELECT COALESCE(SUM(b.views), 0) AS total_views
               FROM user_blog_index i JOIN blogs b ON b.id = i.blog_id
               WHERE i.email = ?"#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total_views: row.get("total_views"),
            total_likes: aggregate.total_likes,
            total_dislikes: aggregate.total_dislikes,
        })
    }

    /// Blogs listed in an author's index, newest first. Dangling entries are skipped.
    pub async fn list_user_blogs(&self, email: &str) -> Result<Vec<Blog>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM user_blog_index i JOIN blogs b ON b.id = i.blog_id
               WHERE i.email = ? ORDER BY i.created_at DESC, b.rowid DESC"#,
            BLOG_COLUMNS
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    // ==================== USERNAME OPERATIONS ====================

    pub async fn get_username(&self, email: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT username FROM usernames WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("username")))
    }

    pub async fn set_username(&self, email: &str, username: &str) -> Result<String, AppError> {
        sqlx::query(
            r#"INSERT INTO usernames (email, username, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(email) DO UPDATE SET username = excluded.username, updated_at = excluded.updated_at"#,
        )
        .bind(email)
        .bind(username)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(username.to_string())
    }

    /// Remove the username record. Posts and the author aggregate are kept.
    pub async fn delete_username(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM usernames WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== HELPERS ====================

    async fn load_engagement(
        &self,
        id: &str,
    ) -> Result<Option<(String, Engagement, i64)>, AppError> {
        let row = sqlx::query(
            "SELECT email, liked_by, disliked_by, likes, dislikes, version FROM blogs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let liked_by: String = row.get("liked_by");
            let disliked_by: String = row.get("disliked_by");
            (
                row.get("email"),
                Engagement {
                    liked_by: parse_json_array(&liked_by),
                    disliked_by: parse_json_array(&disliked_by),
                    likes: row.get("likes"),
                    dislikes: row.get("dislikes"),
                },
                row.get("version"),
            )
        }))
    }

    async fn comments_for(&self, blog_id: &str) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(
            "SELECT text, author, author_key, reactor_email, posted_at FROM blog_comments WHERE blog_id = ? ORDER BY seq",
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Attach comments to a page of blog rows with one query for the whole page.
    async fn hydrate(&self, rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Blog>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|row| row.get("id")).collect();
        let comment_rows = sqlx::query(
            r#"SELECT blog_id, text, author, author_key, reactor_email, posted_at FROM blog_comments
               WHERE blog_id IN (SELECT value FROM json_each(?)) ORDER BY seq"#,
        )
        .bind(serde_json::to_string(&ids)?)
        .fetch_all(&self.pool)
        .await?;

        let mut comments: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in &comment_rows {
            comments
                .entry(row.get("blog_id"))
                .or_default()
                .push(comment_from_row(row));
        }

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                blog_from_row(row, comments.remove(&id).unwrap_or_default())
            })
            .collect())
    }
}

/// Create a zero-valued aggregate for `author_key` if none exists yet.
async fn ensure_aggregate(conn: &mut SqliteConnection, author_key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO user_blogs (email, total_likes, total_dislikes, created_at) VALUES (?, 0, 0, ?)")
        .bind(author_key)
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Apply a delta to an author aggregate in place, flooring both totals at zero.
async fn charge_aggregate(
    conn: &mut SqliteConnection,
    author_key: &str,
    delta: AggregateDelta,
) -> Result<(), sqlx::Error> {
    ensure_aggregate(conn, author_key).await?;

    if delta.is_zero() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE user_blogs SET total_likes = MAX(0, total_likes + ?), total_dislikes = MAX(0, total_dislikes + ?) WHERE email = ?",
    )
    .bind(delta.likes)
    .bind(delta.dislikes)
    .bind(author_key)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn blog_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Blog {} not found", id))
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        text: row.get("text"),
        author: row.get("author"),
        author_key: row.get("author_key"),
        reactor_email: row.get("reactor_email"),
        posted_at_millis: row.get("posted_at"),
    }
}

fn blog_from_row(row: &sqlx::sqlite::SqliteRow, comments: Vec<Comment>) -> Blog {
    let tags: String = row.get("tags");
    let liked_by: String = row.get("liked_by");
    let disliked_by: String = row.get("disliked_by");

    Blog {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        username: row.get("username"),
        email: row.get("email"),
        user_id: row.get("user_id"),
        tags: parse_json_array(&tags),
        liked_by: parse_json_array(&liked_by),
        disliked_by: parse_json_array(&disliked_by),
        likes: row.get("likes"),
        dislikes: row.get("dislikes"),
        views: row.get("views"),
        comments,
        created_at_millis: row.get("created_at"),
        version: row.get("version"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
