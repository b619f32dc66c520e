use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for per-user private channels. A user may only subscribe to the
/// channel carrying their own id.
pub const PRIVATE_CHANNEL_PREFIX: &str = "private-channel.";

/// Channel name for a user's private event stream.
pub fn private_channel(user_id: Uuid) -> String {
    format!("{}{}", PRIVATE_CHANNEL_PREFIX, user_id)
}

/// Extract the user id embedded in a private channel name.
/// Returns `None` for any other channel shape.
pub fn parse_private_channel(name: &str) -> Option<Uuid> {
    name.strip_prefix(PRIVATE_CHANNEL_PREFIX)?.parse().ok()
}

/// Events published onto per-user private channels. These are a latency hint
/// on top of the durable message store, never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelEvent {
    /// A new direct message was stored
    Messaging {
        id: Uuid,
        from_id: Uuid,
        to_id: Uuid,
        body: Option<String>,
        attachment: Option<String>,
        attachment_url: Option<String>,
        created_at: DateTime<Utc>,
        seen: bool,
    },

    /// The peer is typing
    ClientTyping { from_id: Uuid, typing: bool },

    /// The peer read the conversation
    ClientSeen { from_id: Uuid, seen: bool },
}

impl ChannelEvent {
    /// Provider-side event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Messaging { .. } => "messaging",
            Self::ClientTyping { .. } => "client-typing",
            Self::ClientSeen { .. } => "client-seen",
        }
    }
}
