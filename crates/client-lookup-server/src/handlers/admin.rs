//! Admin endpoints: upload, revert, reset-shared
//!
//! Role checks happen in the core; an authenticated non-admin gets 403.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use client_lookup_core::{IngestError, IngestMode, Provenance};

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceChanged {
    pub mode: IngestMode,
    pub source: Provenance,
}

/// POST /api/admin/upload?filename=
///
/// The raw request body is the file. The filename extension selects the input
/// format (CSV, TSV or spreadsheet) and the name is shown back as provenance.
/// If the session is logged out or expires mid-upload the result is
/// discarded with 401.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<ApiResponse<SourceChanged>>, ApiError> {
    let session = state.session(&headers).await?;
    let filename = params.filename.unwrap_or_else(|| "upload.csv".to_string());
    let service = state.service.clone();

    let (session, source) =
        tokio::task::spawn_blocking(move || service.ingest(&session, &body, &filename)).await??;

    state.replace_session(session).await?;
    Ok(Json(ApiResponse::ok(SourceChanged {
        mode: state.service.ingest_mode(),
        source: source.provenance(),
    })))
}

/// POST /api/admin/revert
pub async fn revert(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SourceChanged>>, ApiError> {
    let session = state.session(&headers).await?;
    if !session.is_admin() {
        return Err(IngestError::Forbidden.into());
    }
    let service = state.service.clone();

    let (session, source) = tokio::task::spawn_blocking(move || service.revert(&session)).await??;

    state.replace_session(session).await?;
    Ok(Json(ApiResponse::ok(SourceChanged {
        mode: state.service.ingest_mode(),
        source: source.provenance(),
    })))
}

/// POST /api/admin/reset-shared
pub async fn reset_shared(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SourceChanged>>, ApiError> {
    let session = state.session(&headers).await?;
    let service = state.service.clone();

    let source = tokio::task::spawn_blocking(move || service.reset_shared(&session)).await??;

    Ok(Json(ApiResponse::ok(SourceChanged {
        mode: state.service.ingest_mode(),
        source: source.provenance(),
    })))
}
