pub mod publisher;
pub mod pusher;

pub use publisher::{AuthorizeError, ChannelGrant, ChannelPublisher, authorize_channel};
pub use pusher::{PusherClient, PusherConfig};
