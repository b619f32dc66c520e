use std::str::FromStr;

use axum::{Extension, Json, extract::State};
use tracing::{error, warn};
use uuid::Uuid;

use chirp_db::Database;
use chirp_types::api::{Claims, ContactResponse};

use crate::attachments::avatar_url;
use crate::auth::AppState;
use crate::error::ApiError;

/// Attachment-only messages have no body to preview.
const ATTACHMENT_PREVIEW: &str = "📎 Archivo";

/// Preview shown for mutual followers with no conversation yet.
const NO_HISTORY_PREVIEW: &str = "Sin mensajes";

/// Which users appear in the contact list.
///
/// `AllUsers` lists everyone with prior message history; `MutualFollowers`
/// lists every mutual follower, with a placeholder preview when there is no
/// history yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactScope {
    #[default]
    AllUsers,
    MutualFollowers,
}

impl FromStr for ContactScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_users" => Ok(Self::AllUsers),
            "mutual_followers" => Ok(Self::MutualFollowers),
            other => Err(format!("unknown contact scope '{}'", other)),
        }
    }
}

/// GET /contacts — per-user contact list with last-message preview and
/// unread counts, most recent conversation first.
pub async fn get_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let db = state.db.clone();
    let scope = state.contact_scope;
    let me = claims.sub.to_string();

    let contacts = tokio::task::spawn_blocking(move || build_contacts(&db, &me, scope))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })??;

    Ok(Json(contacts))
}

fn build_contacts(
    db: &Database,
    me: &str,
    scope: ContactScope,
) -> anyhow::Result<Vec<ContactResponse>> {
    let candidates = match scope {
        ContactScope::AllUsers => db.other_users(me)?,
        ContactScope::MutualFollowers => db.mutual_followers(me)?,
    };

    let mut contacts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let last = db.last_message_between(me, &candidate.id)?;

        if scope == ContactScope::AllUsers && last.is_none() {
            // require prior contact in the all-users variant
            continue;
        }

        let unread = db.unread_count(&candidate.id, me)?;

        let last_message = match &last {
            Some(msg) if msg.attachment.is_some() => Some(ATTACHMENT_PREVIEW.to_string()),
            Some(msg) => Some(msg.body.clone().unwrap_or_default()),
            None => Some(NO_HISTORY_PREVIEW.to_string()),
        };
        // None sorts after every real timestamp, so empty conversations land last
        let last_message_date = last.as_ref().and_then(|m| chirp_db::parse_timestamp(&m.created_at));

        let id: Uuid = candidate.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", candidate.id, e);
            Uuid::default()
        });

        contacts.push(ContactResponse {
            id,
            name: candidate.name,
            username: candidate.username,
            avatar: avatar_url(candidate.avatar.as_deref()),
            last_message,
            last_message_date,
            unread_count: unread.max(0) as u32,
            is_online: candidate.active_status != 0,
        });
    }

    contacts.sort_by(|a, b| b.last_message_date.cmp(&a.last_message_date));
    Ok(contacts)
}
