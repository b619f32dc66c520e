use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use chirp_types::events::{ChannelEvent, parse_private_channel};

/// Signed grant handed back to a client subscribing to its private channel.
/// The `auth` string is the provider's signature payload, returned verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelGrant {
    pub auth: String,
}

/// Capability interface over the realtime provider. Injected into handlers
/// so tests can substitute a recording double.
pub trait ChannelPublisher: Send + Sync {
    /// Fire-and-forget publish. Implementations must not block the caller
    /// and must swallow (and log) delivery failures: the durable store is
    /// the source of truth, the channel is only a latency hint.
    fn publish(&self, channel: &str, event: ChannelEvent);

    /// Provider signing primitive for private-channel subscription auth.
    fn sign_subscription(&self, channel: &str, socket_id: &str) -> ChannelGrant;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizeError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("channel does not belong to the requesting user")]
    WrongChannel,
}

/// Validate a subscription-auth request and delegate to the provider's
/// signing primitive. A client may only subscribe to `private-channel.<id>`
/// where `<id>` is its own user id.
pub fn authorize_channel(
    user_id: Uuid,
    channel_name: Option<&str>,
    socket_id: Option<&str>,
    provider: &dyn ChannelPublisher,
) -> Result<ChannelGrant, AuthorizeError> {
    let channel = channel_name
        .filter(|s| !s.is_empty())
        .ok_or(AuthorizeError::MissingField("channel_name"))?;
    let socket = socket_id
        .filter(|s| !s.is_empty())
        .ok_or(AuthorizeError::MissingField("socket_id"))?;

    match parse_private_channel(channel) {
        Some(owner) if owner == user_id => Ok(provider.sign_subscription(channel, socket)),
        _ => Err(AuthorizeError::WrongChannel),
    }
}
