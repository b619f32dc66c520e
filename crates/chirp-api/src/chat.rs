use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use chirp_db::models::MessageRow;
use chirp_types::api::{Claims, MessageResponse, PeerQuery, PeerRequest, SendMessageRequest};
use chirp_types::events::{ChannelEvent, private_channel};

use crate::attachments::{resolve, store_attachment};
use crate::auth::AppState;
use crate::error::ApiError;

/// GET /messages?id=<user> — full thread with the peer, oldest first,
/// attachment URLs resolved.
pub async fn fetch_messages(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();
    let peer = query.id.to_string();

    let rows = tokio::task::spawn_blocking(move || db.thread_between(&me, &peer))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    Ok(Json(rows.into_iter().map(to_message_response).collect()))
}

/// POST /messages — persist the message, then publish a best-effort
/// `messaging` event on the recipient's private channel. The durable write
/// is the source of truth; a lost publish only delays the next poll.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if body.is_none() && req.file.is_none() {
        return Err(ApiError::Validation(
            "message requires a non-empty body or an attachment".into(),
        ));
    }

    let attachment_meta = match &req.file {
        Some(file) => Some(store_attachment(&state.attachment_dir, file).await?),
        None => None,
    };
    let attachment_json = attachment_meta
        .as_ref()
        .map(|meta| serde_json::to_string(meta))
        .transpose()
        .map_err(|e| anyhow::anyhow!("attachment descriptor encode failed: {}", e))?;

    let message_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.db.clone();
    let mid = message_id.to_string();
    let from = claims.sub.to_string();
    let to = req.id.to_string();
    let body_for_insert = body.clone();
    let att_for_insert = attachment_json.clone();
    let insert_result = tokio::task::spawn_blocking(move || {
        db.insert_message(
            &mid,
            &from,
            &to,
            body_for_insert.as_deref(),
            att_for_insert.as_deref(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("task join error"))
    })
    .and_then(|r| r.map_err(ApiError::from));

    let created_at_raw = match insert_result {
        Ok(ts) => ts,
        Err(err) => {
            // The file was stored before the insert; don't leave it orphaned.
            if let Some(meta) = &attachment_meta {
                let path = state.attachment_dir.join(&meta.new_name);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove orphaned attachment '{}': {}", path.display(), e);
                }
            }
            return Err(err);
        }
    };

    let created_at = chirp_db::parse_timestamp(&created_at_raw).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on message '{}'", created_at_raw, message_id);
        chrono::Utc::now()
    });

    let attachment_url = attachment_json.as_deref().and_then(resolve).map(|r| r.url);

    state.publisher.publish(
        &private_channel(req.id),
        ChannelEvent::Messaging {
            id: message_id,
            from_id: claims.sub,
            to_id: req.id,
            body: body.clone(),
            attachment: attachment_json.clone(),
            attachment_url: attachment_url.clone(),
            created_at,
            seen: false,
        },
    );

    let attachment_type = attachment_meta.as_ref().map(|m| m.file_type.clone());
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            from_id: claims.sub,
            to_id: req.id,
            body,
            attachment: attachment_meta,
            attachment_url,
            attachment_type,
            seen: false,
            created_at,
        }),
    ))
}

/// POST /typing — publish a typing hint on the peer's channel.
pub async fn typing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PeerRequest>,
) -> Json<serde_json::Value> {
    state.publisher.publish(
        &private_channel(req.id),
        ChannelEvent::ClientTyping { from_id: claims.sub, typing: true },
    );
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /seen — bulk-mark the peer's messages to us as seen, then tell the
/// peer's channel we read them.
pub async fn make_seen(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PeerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.clone();
    let from = req.id.to_string();
    let to = claims.sub.to_string();

    tokio::task::spawn_blocking(move || db.mark_seen(&from, &to))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    state.publisher.publish(
        &private_channel(req.id),
        ChannelEvent::ClientSeen { from_id: claims.sub, seen: true },
    );

    Ok(Json(serde_json::json!({ "status": "seen" })))
}

pub(crate) fn to_message_response(row: MessageRow) -> MessageResponse {
    let resolved = row.attachment.as_deref().and_then(resolve);

    MessageResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        from_id: row.from_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt from_id '{}' on message '{}': {}", row.from_id, row.id, e);
            Uuid::default()
        }),
        to_id: row.to_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt to_id '{}' on message '{}': {}", row.to_id, row.id, e);
            Uuid::default()
        }),
        body: row.body,
        attachment_url: resolved.as_ref().map(|r| r.url.clone()),
        attachment_type: resolved.as_ref().map(|r| r.meta.file_type.clone()),
        attachment: resolved.map(|r| r.meta),
        seen: row.seen != 0,
        created_at: chirp_db::parse_timestamp(&row.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on message '{}'", row.created_at, row.id);
            chrono::DateTime::default()
        }),
    }
}
