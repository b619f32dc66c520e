//! End-to-end handler flow against an in-memory database, with recording
//! doubles standing in for the realtime and push providers.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use chirp_api::auth::{AppState, AppStateInner};
use chirp_api::contacts::ContactScope;
use chirp_api::{attachments, chat, error::ApiError};
use chirp_db::Database;
use chirp_notify::{NotificationService, PushMessage, PushSender};
use chirp_realtime::{ChannelGrant, ChannelPublisher};
use chirp_types::api::{Claims, FileUpload, PeerQuery, PeerRequest, SendMessageRequest};
use chirp_types::events::{ChannelEvent, private_channel};

struct RecordingPublisher {
    events: Mutex<Vec<(String, ChannelEvent)>>,
}

impl RecordingPublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()) })
    }

    fn take(&self) -> Vec<(String, ChannelEvent)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ChannelPublisher for RecordingPublisher {
    fn publish(&self, channel: &str, event: ChannelEvent) {
        self.events.lock().unwrap().push((channel.to_string(), event));
    }

    fn sign_subscription(&self, _channel: &str, _socket_id: &str) -> ChannelGrant {
        ChannelGrant { auth: "test-key:test-signature".into() }
    }
}

struct NoopPush;

impl PushSender for NoopPush {
    fn send(&self, _push: PushMessage) {}
}

fn setup() -> (AppState, Arc<RecordingPublisher>, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let publisher = RecordingPublisher::new();
    let notify = Arc::new(NotificationService::new(db.clone(), Arc::new(NoopPush)));

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        publisher: publisher.clone(),
        notify,
        jwt_secret: "test-secret".into(),
        contact_scope: ContactScope::AllUsers,
        attachment_dir: std::env::temp_dir().join("chirp-test-attachments"),
    });

    (state, publisher, db)
}

fn add_user(db: &Database, username: &str) -> Claims {
    let id = Uuid::new_v4();
    db.create_user(&id.to_string(), username, username, "hash").unwrap();
    Claims { sub: id, username: username.into(), exp: usize::MAX }
}

#[tokio::test]
async fn send_seen_flow_updates_store_and_publishes_events() {
    let (state, publisher, db) = setup();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");

    // alice sends "hi" to bob
    let resp = chat::send_message(
        State(state.clone()),
        Extension(alice.clone()),
        Json(SendMessageRequest { id: bob.sub, message: Some("hi".into()), file: None }),
    )
    .await
    .expect("send should succeed");
    assert_eq!(resp.into_response().status(), 201);

    // durable write first: row exists, unseen
    assert_eq!(db.unread_count(&alice.sub.to_string(), &bob.sub.to_string()).unwrap(), 1);

    // messaging event fired on bob's private channel
    let events = publisher.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, private_channel(bob.sub));
    match &events[0].1 {
        ChannelEvent::Messaging { from_id, to_id, body, seen, .. } => {
            assert_eq!(*from_id, alice.sub);
            assert_eq!(*to_id, bob.sub);
            assert_eq!(body.as_deref(), Some("hi"));
            assert!(!seen);
        }
        other => panic!("expected Messaging event, got {:?}", other),
    }

    // bob's contact list shows alice with one unread
    let Json(contacts) =
        chirp_api::contacts::get_contacts(State(state.clone()), Extension(bob.clone()))
            .await
            .unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, alice.sub);
    assert_eq!(contacts[0].unread_count, 1);
    assert_eq!(contacts[0].last_message.as_deref(), Some("hi"));

    // bob marks the conversation seen
    let Json(ack) = chat::make_seen(
        State(state.clone()),
        Extension(bob.clone()),
        Json(PeerRequest { id: alice.sub }),
    )
    .await
    .unwrap();
    assert_eq!(ack["status"], "seen");

    let events = publisher.take();
    assert_eq!(events[0].0, private_channel(alice.sub));
    match &events[0].1 {
        ChannelEvent::ClientSeen { from_id, seen } => {
            assert_eq!(*from_id, bob.sub);
            assert!(*seen);
        }
        other => panic!("expected ClientSeen event, got {:?}", other),
    }

    // unread drops to zero and stays there
    let Json(contacts) =
        chirp_api::contacts::get_contacts(State(state.clone()), Extension(bob.clone()))
            .await
            .unwrap();
    assert_eq!(contacts[0].unread_count, 0);

    let Json(messages) = chat::fetch_messages(
        State(state),
        Query(PeerQuery { id: bob.sub }),
        Extension(alice),
    )
    .await
    .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].seen);
}

#[tokio::test]
async fn empty_send_is_rejected() {
    let (state, publisher, db) = setup();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");

    let err = chat::send_message(
        State(state),
        Extension(alice),
        Json(SendMessageRequest { id: bob.sub, message: Some("   ".into()), file: None }),
    )
    .await
    .err()
    .expect("blank message without attachment must fail");
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(publisher.take().is_empty());
}

#[tokio::test]
async fn malformed_attachment_data_is_a_validation_error() {
    let (state, publisher, db) = setup();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");

    let err = chat::send_message(
        State(state),
        Extension(alice),
        Json(SendMessageRequest {
            id: bob.sub,
            message: None,
            file: Some(FileUpload { name: "cat.png".into(), data: "%%%not-base64%%%".into() }),
        }),
    )
    .await
    .err()
    .expect("undecodable attachment data must fail");
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(publisher.take().is_empty());
}

#[tokio::test]
async fn failed_insert_does_not_leave_a_stored_attachment_behind() {
    let (state, publisher, db) = setup();
    let dir = std::env::temp_dir().join(format!("chirp-orphan-{}", Uuid::new_v4()));
    let state = Arc::new(AppStateInner {
        db: state.db.clone(),
        publisher: state.publisher.clone(),
        notify: state.notify.clone(),
        jwt_secret: state.jwt_secret.clone(),
        contact_scope: state.contact_scope,
        attachment_dir: dir.clone(),
    });
    let alice = add_user(&db, "alice");

    // recipient does not exist, so the insert hits the foreign key
    let result = chat::send_message(
        State(state),
        Extension(alice),
        Json(SendMessageRequest {
            id: Uuid::new_v4(),
            message: None,
            file: Some(FileUpload { name: "cat.png".into(), data: "aGVsbG8=".into() }),
        }),
    )
    .await;
    assert!(result.is_err());
    assert!(publisher.take().is_empty());

    let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn attachment_send_resolves_url_and_shows_in_shared_photos() {
    let (state, publisher, db) = setup();
    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");

    let resp = chat::send_message(
        State(state.clone()),
        Extension(alice.clone()),
        Json(SendMessageRequest {
            id: bob.sub,
            message: None,
            file: Some(FileUpload { name: "cat.PNG".into(), data: "aGVsbG8=".into() }),
        }),
    )
    .await
    .expect("attachment-only send should succeed");
    assert_eq!(resp.into_response().status(), 201);

    // attachment-only messages still count toward unread
    assert_eq!(db.unread_count(&alice.sub.to_string(), &bob.sub.to_string()).unwrap(), 1);

    let events = publisher.take();
    match &events[0].1 {
        ChannelEvent::Messaging { body, attachment_url, .. } => {
            assert!(body.is_none());
            let url = attachment_url.as_deref().unwrap();
            assert!(url.starts_with("/storage/attachments/"));
            assert!(url.ends_with(".png"));
        }
        other => panic!("expected Messaging event, got {:?}", other),
    }

    let Json(shared) = attachments::shared_attachments(
        State(state),
        Query(PeerQuery { id: alice.sub }),
        Extension(bob),
    )
    .await
    .unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].name, "cat.PNG");
}

#[tokio::test]
async fn mutual_follower_scope_lists_contacts_without_history() {
    let (state, _publisher, db) = setup();
    let state = Arc::new(AppStateInner {
        db: state.db.clone(),
        publisher: state.publisher.clone(),
        notify: state.notify.clone(),
        jwt_secret: state.jwt_secret.clone(),
        contact_scope: ContactScope::MutualFollowers,
        attachment_dir: state.attachment_dir.clone(),
    });

    let alice = add_user(&db, "alice");
    let bob = add_user(&db, "bob");
    // carol is present but not mutual
    let carol = add_user(&db, "carol");

    db.create_follow(&Uuid::new_v4().to_string(), &alice.sub.to_string(), &bob.sub.to_string())
        .unwrap();
    db.create_follow(&Uuid::new_v4().to_string(), &bob.sub.to_string(), &alice.sub.to_string())
        .unwrap();
    db.create_follow(&Uuid::new_v4().to_string(), &alice.sub.to_string(), &carol.sub.to_string())
        .unwrap();

    let Json(contacts) =
        chirp_api::contacts::get_contacts(State(state), Extension(alice))
            .await
            .unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, bob.sub);
    assert!(contacts[0].last_message_date.is_none());
    assert_eq!(contacts[0].last_message.as_deref(), Some("Sin mensajes"));
}
