use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::error;
use uuid::Uuid;

use chirp_db::Database;
use chirp_types::models::{CommentRef, NotificationKind, PostRef, Profile};

use crate::push::{PushMessage, PushSender};

/// Preview lengths differ between top-level comments and replies; the
/// asymmetry is intentional and preserved.
const COMMENT_PREVIEW_LEN: usize = 100;
const REPLY_PREVIEW_LEN: usize = 30;

/// Outcome of a best-effort notification dispatch. This is deliberately not
/// a `Result`: the triggering business action must never fail because
/// notification delivery failed, so failures are logged and reported as a
/// plain variant the caller can ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Notification row persisted, push handed to the provider
    Created(Uuid),
    /// Self-notification guard: actor and recipient are the same user
    Skipped,
    /// Persistence failed; logged, nothing delivered
    Failed,
}

impl DispatchOutcome {
    pub fn notification_id(&self) -> Option<Uuid> {
        match self {
            Self::Created(id) => Some(*id),
            _ => None,
        }
    }
}

/// Creates persisted notification records and triggers out-of-band push
/// delivery for follow/like/comment/reply events.
pub struct NotificationService {
    db: Arc<Database>,
    push: Arc<dyn PushSender>,
}

impl NotificationService {
    pub fn new(db: Arc<Database>, push: Arc<dyn PushSender>) -> Self {
        Self { db, push }
    }

    pub fn notify_follow(&self, follower: &Profile, followed_id: Uuid) -> DispatchOutcome {
        if follower.id == followed_id {
            return DispatchOutcome::Skipped;
        }

        let payload = serde_json::json!({
            "follower_username": follower.username,
            "follower_name": follower.name,
            "follower_image": follower.avatar,
        });

        let mut data = BTreeMap::new();
        data.insert("user_id", follower.id.to_string());

        self.dispatch(
            NotificationKind::Follow,
            followed_id,
            follower.id,
            None,
            payload,
            "Nuevo seguidor",
            format!("{} empezó a seguirte", follower.name),
            data,
        )
    }

    pub fn notify_like(&self, liker: &Profile, post: &PostRef) -> DispatchOutcome {
        if liker.id == post.author_id {
            return DispatchOutcome::Skipped;
        }

        let payload = serde_json::json!({
            "liker_username": liker.username,
            "liker_name": liker.name,
            "liker_image": liker.avatar,
            "post_title": post.title,
            "post_image": post.image,
        });

        let mut data = BTreeMap::new();
        data.insert("post_id", post.id.to_string());
        data.insert("user_id", liker.id.to_string());

        self.dispatch(
            NotificationKind::Like,
            post.author_id,
            liker.id,
            Some(post.id),
            payload,
            "Nuevo like",
            format!("{} le dio like a tu publicación", liker.name),
            data,
        )
    }

    pub fn notify_comment(
        &self,
        commenter: &Profile,
        post: &PostRef,
        comment_text: Option<&str>,
    ) -> DispatchOutcome {
        if commenter.id == post.author_id {
            return DispatchOutcome::Skipped;
        }

        let preview = comment_text.map(|t| truncate_preview(t, COMMENT_PREVIEW_LEN));

        let payload = serde_json::json!({
            "commenter_username": commenter.username,
            "commenter_name": commenter.name,
            "commenter_image": commenter.avatar,
            "post_title": post.title,
            "post_image": post.image,
            "comment_preview": preview,
        });

        let push_body = match &preview {
            Some(p) => format!("{}: {}", commenter.name, p),
            None => format!("{} comentó tu publicación", commenter.name),
        };

        let mut data = BTreeMap::new();
        data.insert("post_id", post.id.to_string());
        data.insert("user_id", commenter.id.to_string());

        self.dispatch(
            NotificationKind::Comment,
            post.author_id,
            commenter.id,
            Some(post.id),
            payload,
            "Nuevo comentario",
            push_body,
            data,
        )
    }

    /// Notify the author of `parent` that `reply` answered their comment.
    pub fn notify_reply(
        &self,
        sender: &Profile,
        parent: &CommentRef,
        reply: &CommentRef,
        post: &PostRef,
    ) -> DispatchOutcome {
        if parent.author_id == sender.id {
            return DispatchOutcome::Skipped;
        }

        let preview = truncate_preview(&reply.body, REPLY_PREVIEW_LEN);

        let payload = serde_json::json!({
            "sender_username": sender.username,
            "sender_name": sender.name,
            "sender_image": sender.avatar,
            "post_id": post.id.to_string(),
            "parent_comment_id": parent.id.to_string(),
            "reply_id": reply.id.to_string(),
            "comment_preview": preview,
        });

        let push_body = format!("{} respondió tu comentario: \"{}\"", sender.name, preview);

        let mut data = BTreeMap::new();
        data.insert("post_id", post.id.to_string());
        data.insert("user_id", sender.id.to_string());

        self.dispatch(
            NotificationKind::ReplyComment,
            parent.author_id,
            sender.id,
            Some(post.id),
            payload,
            "Nueva Respuesta",
            push_body,
            data,
        )
    }

    // -- Read path --

    pub fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.db.unread_notification_count(&user_id.to_string())
    }

    pub fn mark_all_read(&self, user_id: Uuid) -> Result<usize> {
        self.db.mark_all_notifications_read(&user_id.to_string())
    }

    /// Hard-delete notifications older than `days`.
    pub fn clean_old_notifications(&self, days: i64) -> Result<usize> {
        self.db.delete_notifications_older_than(days)
    }

    /// Persist the row, then hand the push to the provider. The push data
    /// block always carries `type` and `notification_id` on top of the
    /// event-specific ids.
    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        kind: NotificationKind,
        recipient: Uuid,
        sender: Uuid,
        post_id: Option<Uuid>,
        payload: serde_json::Value,
        title: &str,
        push_body: String,
        mut data: BTreeMap<&'static str, String>,
    ) -> DispatchOutcome {
        let id = Uuid::new_v4();
        let post_id = post_id.map(|p| p.to_string());

        if let Err(e) = self.db.insert_notification(
            &id.to_string(),
            &recipient.to_string(),
            &sender.to_string(),
            kind.as_str(),
            post_id.as_deref(),
            &payload.to_string(),
        ) {
            error!("Error creating {} notification: {}", kind.as_str(), e);
            return DispatchOutcome::Failed;
        }

        data.insert("type", kind.as_str().to_string());
        data.insert("notification_id", id.to_string());

        self.push.send(PushMessage {
            user_id: recipient,
            title: title.to_string(),
            body: push_body,
            data,
        });

        DispatchOutcome::Created(id)
    }
}

/// Truncate to `max` characters with an ellipsis marker; text at or under
/// the limit passes through untouched. Counts chars, not bytes.
fn truncate_preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
