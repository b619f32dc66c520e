use axum::{Extension, Json, extract::State};
use tracing::error;

use chirp_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notify = state.notify.clone();
    let user = claims.sub;

    let count = tokio::task::spawn_blocking(move || notify.unread_count(user))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    Ok(Json(serde_json::json!({ "count": count })))
}

/// POST /notifications/mark-read — stamps read_at on every unread row,
/// returns how many were affected.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notify = state.notify.clone();
    let user = claims.sub;

    let marked = tokio::task::spawn_blocking(move || notify.mark_all_read(user))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    Ok(Json(serde_json::json!({ "marked": marked })))
}
