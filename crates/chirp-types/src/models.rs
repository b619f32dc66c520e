use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub active_status: bool,
    pub created_at: DateTime<Utc>,
}

/// Attachment descriptor stored next to a message as a JSON blob.
/// `new_name` is the generated on-disk name, `old_name` the client's original
/// file name, `file_type` the lowercased extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub new_name: String,
    pub old_name: String,
    pub file_type: String,
    pub size: u64,
}

/// Display fields carried into notification payloads. Callers resolve this
/// from whatever user record they already have in hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// Minimal post reference for like/comment notifications.
#[derive(Debug, Clone)]
pub struct PostRef {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub image: Option<String>,
}

/// Minimal comment reference for reply notifications.
#[derive(Debug, Clone)]
pub struct CommentRef {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    ReplyComment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::ReplyComment => "reply_comment",
        }
    }
}
