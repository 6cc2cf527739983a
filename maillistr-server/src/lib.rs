//! maillistr server library
//!
//! Mailing-list collection service: admin endpoints to manage lists, a
//! public endpoint to submit addresses, and best-effort forwarding of new
//! addresses to Mailchimp.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod ingest;

pub use crate::error::{ApiError, ApiResult};

use dispatch::Dispatcher;
use ingest::IngestEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Admin API key checked against the HTTP Basic password
    pub api_key: Arc<str>,
    /// Submission pipeline
    pub engine: IngestEngine,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state. `dispatcher` is `None` when external
    /// sync is disabled.
    pub fn new(db: SqlitePool, api_key: &str, dispatcher: Option<Dispatcher>) -> Self {
        Self {
            engine: IngestEngine::new(db.clone(), dispatcher),
            db,
            api_key: Arc::from(api_key),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Admin routes authenticate through the `AdminAuth` extractor; the entry
/// submission routes and `/health` are public.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/", get(api::list_lists))
        .route(
            "/:slug",
            get(api::show_list)
                .post(api::create_list)
                .delete(api::delete_list),
        )
        .route(
            "/:slug/entries",
            get(api::list_entries).post(api::add_entry),
        )
        .route(
            "/:slug/entries/jsonp",
            get(api::add_entry_jsonp).post(api::add_entry_jsonp),
        )
        .route("/:slug/entries.csv", get(api::list_entries_csv))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Submission forms are usually served from other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}
