use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            name            TEXT NOT NULL,
            avatar          TEXT,
            password        TEXT NOT NULL,
            active_status   INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            from_id     TEXT NOT NULL REFERENCES users(id),
            to_id       TEXT NOT NULL REFERENCES users(id),
            body        TEXT,
            attachment  TEXT,
            seen        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(from_id, to_id, created_at);

        -- UNIQUE(user_id, favorite_id) makes the toggle a single
        -- insert-or-ignore/delete instead of check-then-act.
        CREATE TABLE IF NOT EXISTS favorites (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id),
            favorite_id  TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, favorite_id)
        );

        CREATE TABLE IF NOT EXISTS follows (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id),
            followed_id  TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, followed_id)
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL REFERENCES users(id),
            from_user_id  TEXT NOT NULL REFERENCES users(id),
            type          TEXT NOT NULL,
            post_id       TEXT,
            data          TEXT NOT NULL,
            read_at       TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(user_id, read_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
