//! Database module for SQLite persistence.
//!
//! SQLite plays the role of the document store: one table per collection, with
//! list-valued fields kept as JSON arrays.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blogs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            user_id TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            liked_by TEXT NOT NULL DEFAULT '[]',
            disliked_by TEXT NOT NULL DEFAULT '[]',
            likes INTEGER NOT NULL DEFAULT 0,
            dislikes INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Comments are insert-only rows so concurrent writers never overwrite each other
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_comments (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            blog_id TEXT NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            author TEXT NOT NULL,
            author_key TEXT NOT NULL,
            reactor_email TEXT NOT NULL,
            posted_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_blogs (
            email TEXT PRIMARY KEY,
            total_likes INTEGER NOT NULL DEFAULT 0,
            total_dislikes INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Per-author index of post ids. Entries are removed explicitly on delete.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_blog_index (
            email TEXT NOT NULL,
            blog_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (email, blog_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usernames (
            email TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_blogs_created_at ON blogs(created_at);
        CREATE INDEX IF NOT EXISTS idx_blogs_email ON blogs(email);
        CREATE INDEX IF NOT EXISTS idx_blog_comments_blog ON blog_comments(blog_id, seq);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
