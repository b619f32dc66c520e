use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::dispatcher::NotificationService;

/// Background task that prunes old notification rows.
///
/// Runs on an interval and hard-deletes notifications older than `days`.
/// A failed pass is logged and retried on the next tick.
pub async fn run_retention_loop(service: Arc<NotificationService>, days: i64, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let svc = service.clone();
        match tokio::task::spawn_blocking(move || svc.clean_old_notifications(days)).await {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Retention: pruned {} notifications older than {} days", count, days);
                }
            }
            Ok(Err(e)) => warn!("Retention error: {}", e),
            Err(e) => warn!("Retention join error: {}", e),
        }
    }
}
