//! Rescan and health handlers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::super::AppState;
use super::super::error::AppError;
use crate::library::RescanReport;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    provider: &'static str,
}

/// POST /rescan - Import blobs that have no photo record.
pub(crate) async fn rescan(State(state): State<AppState>) -> Result<Json<RescanReport>, AppError> {
    let report = state.reconciler.rescan().await?;
    Ok(Json(report))
}

/// GET /health - Liveness check, no authentication.
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.library.blobs().name(),
    })
}
