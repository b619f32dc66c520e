/// Database row types — these map directly to SQLite rows.
/// Distinct from the chirp-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub password: String,
    pub active_status: i64,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub body: Option<String>,
    pub attachment: Option<String>,
    pub seen: i64,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub from_user_id: String,
    pub kind: String,
    pub post_id: Option<String>,
    pub data: String,
    pub read_at: Option<String>,
    pub created_at: String,
}
