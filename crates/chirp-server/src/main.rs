use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirp_api::auth::{self, AppState, AppStateInner};
use chirp_api::middleware::require_auth;
use chirp_api::{attachments, chat, contacts, favorites, notifications, realtime};
use chirp_notify::push::{FcmClient, FcmConfig};
use chirp_notify::{NotificationService, retention};
use chirp_realtime::{PusherClient, PusherConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CHIRP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("CHIRP_DB_PATH").unwrap_or_else(|_| "chirp.db".into());
    let host = std::env::var("CHIRP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CHIRP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let attachment_dir =
        std::env::var("CHIRP_ATTACHMENT_DIR").unwrap_or_else(|_| "./storage/attachments".into());
    let contact_scope = std::env::var("CHIRP_CONTACT_SCOPE")
        .unwrap_or_else(|_| "all_users".into())
        .parse()
        .map_err(|e| anyhow::anyhow!("CHIRP_CONTACT_SCOPE: {}", e))?;
    let retention_days: i64 = std::env::var("CHIRP_RETENTION_DAYS")
        .unwrap_or_else(|_| "30".into())
        .parse()?;
    let retention_interval_secs: u64 = std::env::var("CHIRP_RETENTION_INTERVAL_SECS")
        .unwrap_or_else(|_| "3600".into())
        .parse()?;

    // Init database
    let db = Arc::new(chirp_db::Database::open(&PathBuf::from(&db_path))?);

    // Upstream providers
    let publisher = Arc::new(PusherClient::new(PusherConfig {
        app_id: std::env::var("CHIRP_PUSHER_APP_ID").unwrap_or_default(),
        key: std::env::var("CHIRP_PUSHER_KEY").unwrap_or_default(),
        secret: std::env::var("CHIRP_PUSHER_SECRET").unwrap_or_default(),
        host: std::env::var("CHIRP_PUSHER_HOST").unwrap_or_else(|_| "api-eu.pusher.com".into()),
    }));
    let push = Arc::new(FcmClient::new(FcmConfig {
        endpoint: std::env::var("CHIRP_FCM_ENDPOINT")
            .unwrap_or_else(|_| "https://fcm.googleapis.com/fcm/send".into()),
        server_key: std::env::var("CHIRP_FCM_KEY").unwrap_or_default(),
    }));

    let notify = Arc::new(NotificationService::new(db.clone(), push));

    // Age-based notification retention
    tokio::spawn(retention::run_retention_loop(
        notify.clone(),
        retention_days,
        retention_interval_secs,
    ));

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        publisher,
        notify,
        jwt_secret,
        contact_scope,
        attachment_dir: PathBuf::from(attachment_dir),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/contacts", get(contacts::get_contacts))
        .route("/messages", get(chat::fetch_messages))
        .route("/messages", post(chat::send_message))
        .route("/typing", post(chat::typing))
        .route("/seen", post(chat::make_seen))
        .route("/favorites", get(favorites::list))
        .route("/favorites/toggle", post(favorites::toggle))
        .route("/favorites/check", get(favorites::check))
        .route("/attachments/shared", get(attachments::shared_attachments))
        .route("/realtime/auth", post(realtime::channel_auth))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/mark-read", post(notifications::mark_read))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Chirp server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
