//! SheetForge Gateway
//!
//! Router assembly and service wiring. The binary in `main.rs` binds a
//! socket around this; integration tests drive the router directly.

pub mod ai;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use middleware::request_id_middleware;

/// Slack on top of the upload cap for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health::health_check))
        // API routes
        .nest("/api", routes::create_api_routes())
        // Middleware stack
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::CONTENT_TYPE]),
                )
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}
