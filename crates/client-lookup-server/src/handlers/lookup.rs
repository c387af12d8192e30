//! Read-side endpoints: current source and search

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use client_lookup_core::{LookupView, Provenance};

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Cap on rows returned for a non-blank query
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub view: LookupView,
    /// Rows held back by `limit`
    pub truncated: usize,
}

/// GET /api/source
pub async fn current_source(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Provenance>>, ApiError> {
    let session = state.session(&headers).await?;
    let service = state.service.clone();
    let source = tokio::task::spawn_blocking(move || service.resolve(&session)).await??;
    Ok(Json(ApiResponse::ok(source.provenance())))
}

/// GET /api/search?q=&limit=
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let session = state.session(&headers).await?;
    let service = state.service.clone();
    let query = params.q.clone();
    let view = tokio::task::spawn_blocking(move || service.lookup(&session, &query)).await??;

    let (view, truncated) = apply_limit(view, params.limit);
    tracing::debug!(query = %params.q, rows = view.rows().len(), truncated, "Search served");
    Ok(Json(ApiResponse::ok(SearchResponse { view, truncated })))
}

fn apply_limit(mut view: LookupView, limit: Option<usize>) -> (LookupView, usize) {
    let Some(limit) = limit else {
        return (view, 0);
    };
    let truncated = match &mut view {
        LookupView::Results { outcome, .. } if outcome.matches.len() > limit => {
            let dropped = outcome.matches.len() - limit;
            outcome.matches.truncate(limit);
            dropped
        }
        _ => 0,
    };
    (view, truncated)
}
