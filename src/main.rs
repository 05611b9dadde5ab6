//! AV Template Engine
//!
//! REST backend for versioned room, equipment-package, project and quote
//! templates, with SQLite persistence and Tantivy full-text search.

mod api;
mod apply;
mod config;
mod db;
mod errors;
mod models;
mod search;
mod services;
mod templates;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apply::ApplicationEngine;
use config::Config;
use db::Repository;
use search::SearchIndex;
use templates::TemplateService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub templates: Arc<TemplateService>,
    pub engine: Arc<ApplicationEngine>,
}

impl AppState {
    /// Wire the services over one repository. The repository also serves as
    /// the room, project and quote store.
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, grid_spacing: f64) -> Self {
        let templates = Arc::new(TemplateService::new(Arc::clone(&repo), search));
        let engine = Arc::new(ApplicationEngine::new(
            Arc::clone(&repo),
            repo.clone(),
            repo.clone(),
            repo.clone(),
            grid_spacing,
        ));

        Self {
            repo,
            templates,
            engine,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting AV Template Engine");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Package grid spacing: {}", config.grid_spacing);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let templates = repo.list_all_templates().await?;
    search.rebuild(&templates).await?;

    let state = AppState::new(repo, search, config.grid_spacing);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

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

    // API routes
    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Templates
        .route("/templates", get(api::list_templates).post(api::create_template))
        .route(
            "/templates/{id}",
            get(api::get_template)
                .put(api::update_template)
                .delete(api::delete_template),
        )
        .route("/templates/{id}/full", get(api::get_template_full))
        .route("/templates/{id}/content", put(api::update_template_content))
        .route("/templates/{id}/archive", post(api::archive_template))
        .route("/templates/{id}/unarchive", post(api::unarchive_template))
        .route("/templates/{id}/publish", post(api::publish_template))
        .route("/templates/{id}/unpublish", post(api::unpublish_template))
        .route("/templates/{id}/fork", post(api::fork_template))
        .route("/templates/{id}/duplicate", post(api::duplicate_template))
        .route("/templates/{id}/promote", post(api::promote_template))
        // Versions
        .route("/templates/{id}/versions", get(api::list_versions))
        .route("/templates/{id}/versions/current", get(api::get_current_version))
        .route("/templates/{id}/versions/{n}", get(api::get_version))
        .route("/templates/{id}/versions/{n}/restore", post(api::restore_version))
        // Application
        .route("/templates/{id}/apply", post(api::apply_template))
        // Created entities
        .route("/rooms/{id}", get(api::get_room))
        .route("/projects/{id}", get(api::get_project))
        .route("/projects/{id}/rooms", get(api::list_project_rooms))
        .route("/quotes/{id}", get(api::get_quote));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
