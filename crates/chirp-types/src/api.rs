use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AttachmentMeta;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and anything else that
/// validates tokens. Canonical definition lives here to avoid duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Chat --

/// Inline upload: raw bytes arrive base64-encoded alongside the message.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Recipient user id
    pub id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file: Option<FileUpload>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub body: Option<String>,
    pub attachment: Option<AttachmentMeta>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// `?id=<user>` query used by the message, seen and shared-attachment routes.
#[derive(Debug, Deserialize)]
pub struct PeerQuery {
    pub id: Uuid,
}

/// `{id}` body used by typing/seen/favorite actions.
#[derive(Debug, Deserialize)]
pub struct PeerRequest {
    pub id: Uuid,
}

// -- Contacts --

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub last_message: Option<String>,
    pub last_message_date: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub is_online: bool,
}

// -- Favorites --

#[derive(Debug, Serialize)]
pub struct FavoriteProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

// -- Attachments --

#[derive(Debug, Serialize)]
pub struct SharedAttachment {
    pub id: Uuid,
    pub url: String,
    pub name: String,
}

// -- Realtime --

/// Both fields are required; they stay `Option` so a missing one maps to a
/// 400 instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct ChannelAuthRequest {
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub socket_id: Option<String>,
}
