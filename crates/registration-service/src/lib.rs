//! Registration Service
//!
//! Accepts applicant registrations for the training programs, stores the
//! optional identification document and issues sequential ticket numbers.
//!
//! ## Endpoints
//!
//! - `POST /api/register` - Submit a registration (JSON or multipart)
//! - `GET /health` - Health check

pub mod attachments;
pub mod config;
pub mod counter;
pub mod handlers;
pub mod intake;
pub mod service;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::AppState;
pub use service::{RegistrationService, Submission};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/register", post(handlers::register_handler))
        .with_state(shared_state)
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
