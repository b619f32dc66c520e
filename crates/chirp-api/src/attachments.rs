use std::path::Path;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, warn};
use uuid::Uuid;

use chirp_types::api::{Claims, FileUpload, PeerQuery, SharedAttachment};
use chirp_types::models::AttachmentMeta;

use crate::auth::AppState;
use crate::error::ApiError;

pub const ATTACHMENT_URL_BASE: &str = "/storage/attachments/";
pub const AVATAR_URL_BASE: &str = "/storage/users-avatar/";
pub const DEFAULT_AVATAR: &str = "avatar.png";

const IMAGE_TYPES: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    File,
}

impl MediaKind {
    pub fn from_file_type(file_type: &str) -> Self {
        if IMAGE_TYPES.contains(&file_type.to_lowercase().as_str()) {
            Self::Image
        } else {
            Self::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    pub meta: AttachmentMeta,
    pub url: String,
    pub kind: MediaKind,
}

/// Turn a stored descriptor into a retrievable URL and media tag.
/// A malformed descriptor resolves to `None` so one bad row never fails a
/// whole message fetch.
pub fn resolve(descriptor: &str) -> Option<ResolvedAttachment> {
    let meta: AttachmentMeta = serde_json::from_str(descriptor).ok()?;
    let url = format!("{}{}", ATTACHMENT_URL_BASE, meta.new_name);
    let kind = MediaKind::from_file_type(&meta.file_type);
    Some(ResolvedAttachment { meta, url, kind })
}

/// Avatar URL with the default-asset fallback.
pub fn avatar_url(avatar: Option<&str>) -> String {
    match avatar {
        Some(name) if !name.is_empty() => format!("{}{}", AVATAR_URL_BASE, name),
        _ => format!("{}{}", AVATAR_URL_BASE, DEFAULT_AVATAR),
    }
}

/// Decode an inline upload and store it under a generated name, keeping the
/// original extension for media classification.
pub async fn store_attachment(dir: &Path, file: &FileUpload) -> Result<AttachmentMeta, ApiError> {
    // Bad base64 is the client's doing, not ours
    let bytes = B64
        .decode(&file.data)
        .map_err(|e| ApiError::Validation(format!("attachment data is not valid base64: {}", e)))?;

    let ext = Path::new(&file.name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_lowercase();
    let new_name = format!("{}.{}", Uuid::new_v4(), ext);

    tokio::fs::create_dir_all(dir).await.context("creating attachment dir")?;
    tokio::fs::write(dir.join(&new_name), &bytes)
        .await
        .context("writing attachment")?;

    Ok(AttachmentMeta {
        new_name,
        old_name: file.name.clone(),
        file_type: ext,
        size: bytes.len() as u64,
    })
}

/// GET /attachments/shared?id= — image attachments shared between the
/// requesting user and a peer, newest first.
pub async fn shared_attachments(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SharedAttachment>>, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();
    let peer = query.id.to_string();

    let rows = tokio::task::spawn_blocking(move || db.attachments_between(&me, &peer))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    let images = rows
        .into_iter()
        .filter_map(|msg| {
            let resolved = resolve(msg.attachment.as_deref()?)?;
            if resolved.kind != MediaKind::Image {
                return None;
            }
            let id = msg.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt message id '{}': {}", msg.id, e);
                Uuid::default()
            });
            Some(SharedAttachment {
                id,
                url: resolved.url,
                name: resolved.meta.old_name,
            })
        })
        .collect();

    Ok(Json(images))
}
