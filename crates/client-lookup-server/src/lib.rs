//! Client Lookup Server
//!
//! HTTP front end over [`client_lookup_core::LookupService`].
//!
//! ```text
//! GET  /health
//! POST /api/login               {credential} -> {session_id, role, expires_at}
//! POST /api/logout
//! GET  /api/source              provenance of the authoritative table
//! GET  /api/search?q=&limit=    preview (blank q) or full match set
//! POST /api/admin/upload?filename=   raw body is the table
//! POST /api/admin/revert
//! POST /api/admin/reset-shared
//! ```
//!
//! Every route under `/api` except login expects
//! `Authorization: Bearer <session_id>`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResponse};
pub use state::{create_session_store, AppState, SessionEntry, SessionStore};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/login", post(handlers::session::login))
        .route("/logout", post(handlers::session::logout))
        .route("/source", get(handlers::lookup::current_source))
        .route("/search", get(handlers::lookup::search))
        .route("/admin/upload", post(handlers::admin::upload))
        .route("/admin/revert", post(handlers::admin::revert))
        .route("/admin/reset-shared", post(handlers::admin::reset_shared));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
