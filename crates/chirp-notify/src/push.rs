use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// One push delivery attempt. `data` always carries `type` and
/// `notification_id`, plus the entity ids relevant to the event — every
/// value serialized as a string regardless of the underlying type.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<&'static str, String>,
}

/// Capability interface over the push provider. Fire-and-forget: a send
/// must never block the caller or surface delivery failures.
pub trait PushSender: Send + Sync {
    fn send(&self, push: PushMessage);
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Full endpoint URL the provider accepts deliveries on
    pub endpoint: String,
    pub server_key: String,
}

/// HTTP push provider. The provider owns the user-id -> device-token
/// mapping; we hand it the target user id and a structured data block.
pub struct FcmClient {
    cfg: FcmConfig,
    http: reqwest::Client,
}

impl FcmClient {
    pub fn new(cfg: FcmConfig) -> Self {
        Self { cfg, http: reqwest::Client::new() }
    }
}

impl PushSender for FcmClient {
    fn send(&self, push: PushMessage) {
        let http = self.http.clone();
        let endpoint = self.cfg.endpoint.clone();
        let server_key = self.cfg.server_key.clone();

        // At-most-once: one attempt, failures are logged and dropped
        tokio::spawn(async move {
            let target = push.user_id;
            match http
                .post(&endpoint)
                .header(reqwest::header::AUTHORIZATION, format!("key={}", server_key))
                .json(&push)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!("Push to {} rejected: {}", target, resp.status()),
                Err(e) => warn!("Push to {} failed: {}", target, e),
            }
        });
    }
}
