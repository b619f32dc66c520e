use axum::{
    Extension, Json,
    extract::{Query, State},
};
use tracing::{error, warn};
use uuid::Uuid;

use chirp_types::api::{Claims, FavoriteProfile, PeerQuery, PeerRequest};

use crate::attachments::avatar_url;
use crate::auth::AppState;
use crate::error::ApiError;

/// POST /favorites/toggle — atomic add/remove of the (me, target) edge.
pub async fn toggle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PeerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.clone();
    let edge_id = Uuid::new_v4().to_string();
    let me = claims.sub.to_string();
    let target = req.id.to_string();

    let added = tokio::task::spawn_blocking(move || db.toggle_favorite(&edge_id, &me, &target))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    let status = if added { "added" } else { "removed" };
    Ok(Json(serde_json::json!({ "status": status })))
}

/// GET /favorites/check?id=
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();
    let target = query.id.to_string();

    let is_favorite = tokio::task::spawn_blocking(move || db.is_favorite(&me, &target))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    Ok(Json(serde_json::json!({ "is_favorite": is_favorite })))
}

/// GET /favorites — profiles the requesting user marked as favorite.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<FavoriteProfile>>, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.favorites_of(&me))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    let favorites = rows
        .into_iter()
        .map(|row| FavoriteProfile {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            }),
            name: row.name,
            avatar: avatar_url(row.avatar.as_deref()),
        })
        .collect();

    Ok(Json(favorites))
}
