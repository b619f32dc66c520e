pub mod dispatcher;
pub mod push;
pub mod retention;

pub use dispatcher::{DispatchOutcome, NotificationService};
pub use push::{FcmClient, FcmConfig, PushMessage, PushSender};
