//! Login and logout

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use client_lookup_core::{Role, Session};

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub credential: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/login
///
/// Presenting a bearer token for an existing session re-uses it; a session
/// that is already signed in keeps its role. Every login restarts the
/// session's lifetime.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let current = state.session(&headers).await.unwrap_or_default();
    let session = state.service.authenticate(&current, &req.credential)?;

    let session_id = session.id();
    let role = session.role();
    let expires_at = state.start_session(session).await;
    Ok(Json(ApiResponse::ok(LoginResponse {
        session_id,
        role,
        expires_at,
    })))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let session: Session = state.session(&headers).await?;
    let ended = state.end_session(session.id()).await;
    tracing::info!(session = %session.id(), "Session ended");
    Ok(Json(ApiResponse::ok(ended)))
}
