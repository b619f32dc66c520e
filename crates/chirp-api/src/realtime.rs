use axum::{Extension, Json, extract::State};

use chirp_realtime::{ChannelGrant, authorize_channel};
use chirp_types::api::{ChannelAuthRequest, Claims};

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /realtime/auth — validate a private-channel subscription request
/// and return the provider-signed grant verbatim. Missing fields are a 400,
/// someone else's channel is a 403.
pub async fn channel_auth(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChannelAuthRequest>,
) -> Result<Json<ChannelGrant>, ApiError> {
    let grant = authorize_channel(
        claims.sub,
        req.channel_name.as_deref(),
        req.socket_id.as_deref(),
        state.publisher.as_ref(),
    )?;

    Ok(Json(grant))
}
