//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub temp_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_files: Option<usize>,
}

/// Liveness probe - process is running.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - the temp directory exists and is writable.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to accept uploads", body = ReadinessResponse),
        (status = 503, description = "Temp directory unusable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.temp_store.clone();
    let probe = tokio::task::spawn_blocking(move || {
        store
            .ensure_directory()
            .map(|()| store.tracked_file_count())
    })
    .await;

    match probe {
        Ok(Ok(temp_files)) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                temp_dir: "writable".to_string(),
                temp_files: Some(temp_files),
            }),
        ),
        Ok(Err(e)) => {
            tracing::error!(
                error = %e,
                dir = %state.temp_store.root().display(),
                "Temp directory readiness check failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    temp_dir: "not_writable".to_string(),
                    temp_files: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Readiness probe task failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    temp_dir: "unknown".to_string(),
                    temp_files: None,
                }),
            )
        }
    }
}
