//! agora-ai library interface
//!
//! AI enrichment service for the Agora debate platform: generates article
//! titles, derives issue cards from articles and community posts, and proposes
//! votes for approved issues. All enrichment is idempotent; re-running any
//! operation never duplicates output.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod generation;
pub mod models;
pub mod queue;
pub mod services;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::Engine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Enrichment engine
    pub engine: Arc<Engine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, engine: Arc<Engine>) -> Self {
        Self {
            db,
            engine,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::title_routes())
        .merge(api::issue_routes())
        .merge(api::health_routes())
        .with_state(state)
}
