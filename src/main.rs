//! Blawg Backend
//!
//! REST backend for a blogging platform: posts, comments, likes and dislikes,
//! per-author engagement totals, with SQLite persistence and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod ledger;
mod models;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Starting Blawg backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if the API key is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API key configured (BLAWG_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool).with_reaction_attempts(config.reaction_attempts));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // The index is derived data; rebuild it from the store on every start
    tracing::info!("Building search index...");
    let blogs = repo.all_blogs().await?;
    search.rebuild(&blogs).await?;

    // Create application state
    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the key for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Posts
        .route("/blogs", get(api::get_blogs).post(api::create_blog))
        .route("/blogs/update", post(api::update_blog))
        .route("/blogs/delete", post(api::delete_blog))
        .route("/blogs/view", post(api::view_blog))
        // Engagement
        .route("/blogs/like", post(api::like_blog))
        .route("/blogs/dislike", post(api::dislike_blog))
        .route("/blogs/comment", post(api::comment_blog))
        // Authors
        .route("/userstats", get(api::user_stats))
        .route("/userblogs", get(api::user_blogs))
        .route(
            "/user/{email}",
            get(api::get_username)
                .post(api::set_username)
                .delete(api::delete_username),
        )
        // Search
        .route("/search", get(api::search_blogs))
        // Apply API-key middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::api_key_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
