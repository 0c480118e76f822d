//! Recipe Hub Backend
//!
//! REST backend for a social recipe-sharing site, with SQLite persistence and
//! Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod notify;
mod search;
mod services;
mod social;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::TokenIssuer;
use config::Config;
use db::Repository;
use notify::NotificationDispatcher;
use search::SearchIndex;
use services::{EmailSender, ImageStore, LocalImageStore, LogEmailSender, MAX_IMAGE_BYTES};
use social::SocialGraph;
use stats::StatsEngine;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    pub tokens: TokenIssuer,
    pub stats: StatsEngine,
    pub notifier: NotificationDispatcher,
    pub social: SocialGraph,
    pub images: Arc<dyn ImageStore>,
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    /// Wire the services on top of the store, the index and the collaborators.
    pub fn new(
        repo: Arc<Repository>,
        search: Arc<SearchIndex>,
        config: Config,
        images: Arc<dyn ImageStore>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(
            repo.clone(),
            Duration::from_secs(config.dedupe_window_secs),
        );
        Self {
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours),
            stats: StatsEngine::new(repo.clone()),
            social: SocialGraph::new(repo.clone(), notifier.clone(), search.clone()),
            notifier,
            repo,
            search,
            config: Arc::new(config),
            images,
            mailer,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Recipe Hub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.has_ephemeral_secret() {
        tracing::warn!(
            "No token secret configured (RECIPES_JWT_SECRET). Tokens will not survive a restart!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let recipes = repo.list_all_recipes().await?;
    search.rebuild(&recipes).await?;
    tracing::info!("Search index built with {} recipes", recipes.len());

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(config.upload_dir.clone()));
    let mailer: Arc<dyn EmailSender> = Arc::new(LogEmailSender::new());

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, search, config, images, mailer);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/me", get(api::current_user))
        .route("/forgot-password", post(api::forgot_password))
        .route("/verify-reset-token/{token}", get(api::verify_reset_token))
        .route("/reset-password", post(api::reset_password))
        .route("/change-password", post(api::change_password))
        .route("/account", delete(api::delete_account));

    let recipe_routes = Router::new()
        .route("/", get(api::list_recipes))
        .route("/", post(api::create_recipe))
        .route("/search", get(api::search_recipes))
        .route("/category/{category}", get(api::recipes_by_category))
        .route("/user/me", get(api::my_recipes))
        .route("/user/{user_id}", get(api::user_recipes))
        .route("/favorites/me", get(api::my_favorites))
        .route("/saved/me", get(api::my_saved))
        .route("/upload-image", post(api::upload_recipe_image))
        .route("/{id}", get(api::get_recipe))
        .route("/{id}", put(api::update_recipe))
        .route("/{id}", delete(api::delete_recipe))
        .route("/{id}/favorite", post(api::add_favorite))
        .route("/{id}/favorite", delete(api::remove_favorite))
        .route("/{id}/favorite/toggle", post(api::toggle_favorite))
        .route("/{id}/save", post(api::save_recipe))
        .route("/{id}/save", delete(api::unsave_recipe))
        .route("/{id}/share", post(api::share_recipe))
        .route("/{id}/report", post(api::report_recipe))
        .route("/{id}/reviews", get(api::list_reviews))
        .route("/{id}/reviews", post(api::add_review))
        .route("/{id}/reviews/{review_id}", delete(api::delete_review));

    let profile_routes = Router::new()
        .route("/", get(api::get_profile))
        .route("/", put(api::update_profile))
        .route("/stats", get(api::my_stats))
        .route("/stats/{user_id}", get(api::user_stats))
        .route("/author/{user_id}", get(api::get_author_profile))
        .route("/picture", post(api::upload_profile_picture))
        .route("/cover", post(api::upload_cover_picture))
        .route("/follow/{user_id}", post(api::toggle_follow))
        .route("/followers", get(api::my_followers))
        .route("/followers/{user_id}", get(api::user_followers))
        .route("/following", get(api::my_following))
        .route("/following/{user_id}", get(api::user_following))
        .route("/saved-recipes", get(api::my_saved))
        .route("/favorite-recipes", get(api::my_favorites))
        .route("/badges", get(api::my_badges))
        .route("/badges", post(api::add_badge))
        .route("/badges/{user_id}", get(api::user_badges))
        .route("/chefs", get(api::list_chefs))
        .route("/{user_id}", get(api::get_user_profile))
        .route("/{user_id}/recipes", get(api::user_recipes));

    let notification_routes = Router::new()
        .route("/", get(api::list_notifications))
        .route("/", delete(api::clear_notifications))
        .route("/unread-count", get(api::unread_count))
        .route("/read-all", patch(api::mark_all_read))
        .route("/{id}/read", patch(api::mark_read))
        .route("/{id}", delete(api::delete_notification));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/recipes", recipe_routes)
        .nest("/profile", profile_routes)
        .nest("/notifications", notification_routes)
        // Image bodies are raw; the image store enforces its own size cap
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
