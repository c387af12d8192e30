pub mod admin;
pub mod lookup;
pub mod session;

use axum::Json;

use crate::error::ApiResponse;

/// GET /health
pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}
