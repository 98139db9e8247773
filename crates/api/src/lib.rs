//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for creating, editing and listing documents
//! - Mapping of posting errors to JSON error responses
//! - Shared application state

pub mod error;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use stockbook_core::projection::ProjectionCache;
use stockbook_db::TransactionRepository;
use stockbook_shared::PostingConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Cached list and detail views.
    pub cache: Arc<ProjectionCache>,
    /// Posting engine settings.
    pub posting: PostingConfig,
}

impl AppState {
    /// Creates the state with a cache sized from the posting settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, posting: PostingConfig) -> Self {
        let cache = ProjectionCache::with_config(
            posting.projection_cache_capacity,
            posting.projection_cache_ttl_secs,
        );

        Self {
            db: Arc::new(db),
            cache: Arc::new(cache),
            posting,
        }
    }

    /// Returns a document writer that evicts this state's cached views.
    #[must_use]
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new((*self.db).clone())
            .with_max_attempts(self.posting.numbering_max_attempts)
            .with_invalidator(self.cache.clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
