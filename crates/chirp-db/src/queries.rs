use crate::models::{MessageRow, NotificationRow, UserRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Everyone except the requesting user, for the all-users contact scope.
    pub fn other_users(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users u WHERE u.id != ?1 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users who follow `user_id` and are followed back by them.
    pub fn mutual_followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users u
                 JOIN follows f1 ON f1.user_id = ?1 AND f1.followed_id = u.id
                 JOIN follows f2 ON f2.user_id = u.id AND f2.followed_id = ?1
                 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    pub fn create_follow(&self, id: &str, user_id: &str, followed_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (id, user_id, followed_id) VALUES (?1, ?2, ?3)",
                (id, user_id, followed_id),
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        from_id: &str,
        to_id: &str,
        body: Option<&str>,
        attachment: Option<&str>,
    ) -> Result<String> {
        let created_at = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, from_id, to_id, body, attachment, seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                (id, from_id, to_id, body, attachment, &created_at),
            )?;
            Ok(())
        })?;
        Ok(created_at)
    }

    /// Full conversation between two users, both directions, oldest first.
    pub fn thread_between(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MSG_COLS} FROM messages
                 WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt
                .query_map([a, b], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recent message between two users in either direction.
    pub fn last_message_between(&self, a: &str, b: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MSG_COLS} FROM messages
                 WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
                 ORDER BY created_at DESC LIMIT 1"
            ))?;
            let row = stmt.query_row([a, b], map_message_row).optional()?;
            Ok(row)
        })
    }

    /// Unseen messages sent by `from_id` to `to_id`. Attachment-only
    /// messages count the same as text messages.
    pub fn unread_count(&self, from_id: &str, to_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE from_id = ?1 AND to_id = ?2 AND seen = 0",
                [from_id, to_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Bulk-mark the `from_id -> to_id` direction as seen. Idempotent;
    /// returns the number of rows flipped.
    pub fn mark_seen(&self, from_id: &str, to_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE messages SET seen = 1 WHERE from_id = ?1 AND to_id = ?2 AND seen = 0",
                [from_id, to_id],
            )?;
            Ok(affected)
        })
    }

    /// Messages carrying an attachment between two users, newest first.
    pub fn attachments_between(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MSG_COLS} FROM messages
                 WHERE ((from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1))
                   AND attachment IS NOT NULL
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([a, b], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Favorites --

    /// Toggle a favorite edge. The UNIQUE(user_id, favorite_id) constraint
    /// turns this into insert-or-ignore followed by a delete when the row
    /// already existed, so concurrent duplicate toggles cannot double-insert.
    /// Returns true if the favorite was added, false if removed.
    pub fn toggle_favorite(&self, id: &str, user_id: &str, favorite_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO favorites (id, user_id, favorite_id) VALUES (?1, ?2, ?3)",
                (id, user_id, favorite_id),
            )?;
            if inserted == 0 {
                conn.execute(
                    "DELETE FROM favorites WHERE user_id = ?1 AND favorite_id = ?2",
                    [user_id, favorite_id],
                )?;
                Ok(false)
            } else {
                Ok(true)
            }
        })
    }

    pub fn is_favorite(&self, user_id: &str, favorite_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM favorites WHERE user_id = ?1 AND favorite_id = ?2",
                [user_id, favorite_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn favorites_of(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users u
                 JOIN favorites f ON f.favorite_id = u.id
                 WHERE f.user_id = ?1
                 ORDER BY f.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        from_user_id: &str,
        kind: &str,
        post_id: Option<&str>,
        data: &str,
    ) -> Result<()> {
        let created_at = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, from_user_id, type, post_id, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (id, user_id, from_user_id, kind, post_id, data, &created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, from_user_id, type, post_id, data, read_at, created_at
                 FROM notifications WHERE id = ?1",
            )?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        from_user_id: row.get(2)?,
                        kind: row.get(3)?,
                        post_id: row.get(4)?,
                        data: row.get(5)?,
                        read_at: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read_at IS NULL",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Stamp read_at on every unread notification. Returns rows affected.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE notifications SET read_at = ?2 WHERE user_id = ?1 AND read_at IS NULL",
                (user_id, &now),
            )?;
            Ok(affected)
        })
    }

    /// Hard-delete notifications older than `days`. Irreversible.
    pub fn delete_notifications_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = format!("-{} days", days);
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "DELETE FROM notifications WHERE created_at < datetime('now', ?1)",
                [&cutoff],
            )?;
            Ok(affected)
        })
    }
}

const USER_COLS: &str = "u.id, u.username, u.name, u.avatar, u.password, u.active_status, u.created_at";
const MSG_COLS: &str = "id, from_id, to_id, body, attachment, seen, created_at";

fn query_user(conn: &Connection, col: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLS} FROM users u WHERE u.{col} = ?1"
    ))?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        avatar: row.get(3)?,
        password: row.get(4)?,
        active_status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        body: row.get(3)?,
        attachment: row.get(4)?,
        seen: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, username, "hash").unwrap();
        id
    }

    fn send(db: &Database, from: &str, to: &str, body: Option<&str>, att: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, from, to, body, att).unwrap();
        id
    }

    #[test]
    fn thread_is_symmetric_and_ascending() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        let m1 = send(&db, &a, &b, Some("hi"), None);
        let m2 = send(&db, &b, &a, Some("hey"), None);
        let m3 = send(&db, &a, &b, Some("how are you"), None);

        let ab = db.thread_between(&a, &b).unwrap();
        let ids: Vec<&str> = ab.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![m1.as_str(), m2.as_str(), m3.as_str()]);
        assert!(ab.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let ba = db.thread_between(&b, &a).unwrap();
        let ids_rev: Vec<&str> = ba.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ids_rev);
    }

    #[test]
    fn unread_then_mark_seen_is_idempotent() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        send(&db, &a, &b, Some("hi"), None);
        assert_eq!(db.unread_count(&a, &b).unwrap(), 1);
        // the other direction is untouched
        assert_eq!(db.unread_count(&b, &a).unwrap(), 0);

        assert_eq!(db.mark_seen(&a, &b).unwrap(), 1);
        assert_eq!(db.unread_count(&a, &b).unwrap(), 0);
        assert_eq!(db.mark_seen(&a, &b).unwrap(), 0);
    }

    #[test]
    fn attachment_only_message_counts_as_unread() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        send(&db, &a, &b, None, Some(r#"{"new_name":"x.png","old_name":"x.png","file_type":"png","size":10}"#));
        assert_eq!(db.unread_count(&a, &b).unwrap(), 1);
    }

    #[test]
    fn favorite_toggle_flips_and_is_consistent() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        let id1 = Uuid::new_v4().to_string();
        assert!(db.toggle_favorite(&id1, &a, &b).unwrap());
        assert!(db.is_favorite(&a, &b).unwrap());
        // asymmetric edge
        assert!(!db.is_favorite(&b, &a).unwrap());

        let id2 = Uuid::new_v4().to_string();
        assert!(!db.toggle_favorite(&id2, &a, &b).unwrap());
        assert!(!db.is_favorite(&a, &b).unwrap());

        let id3 = Uuid::new_v4().to_string();
        assert!(db.toggle_favorite(&id3, &a, &b).unwrap());
        assert_eq!(db.favorites_of(&a).unwrap().len(), 1);
    }

    #[test]
    fn attachments_between_newest_first() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        let old = send(&db, &a, &b, None, Some(r#"{"new_name":"1.png","old_name":"1.png","file_type":"png","size":1}"#));
        send(&db, &b, &a, Some("plain text"), None);
        let new = send(&db, &b, &a, None, Some(r#"{"new_name":"2.jpg","old_name":"2.jpg","file_type":"jpg","size":2}"#));

        let atts = db.attachments_between(&a, &b).unwrap();
        let ids: Vec<&str> = atts.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![new.as_str(), old.as_str()]);
    }

    #[test]
    fn mutual_followers_requires_both_directions() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");
        let c = add_user(&db, "carol");

        db.create_follow(&Uuid::new_v4().to_string(), &a, &b).unwrap();
        db.create_follow(&Uuid::new_v4().to_string(), &b, &a).unwrap();
        db.create_follow(&Uuid::new_v4().to_string(), &a, &c).unwrap();

        let mutuals = db.mutual_followers(&a).unwrap();
        assert_eq!(mutuals.len(), 1);
        assert_eq!(mutuals[0].id, b);
    }

    #[test]
    fn notification_read_lifecycle() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        let n1 = Uuid::new_v4().to_string();
        db.insert_notification(&n1, &b, &a, "follow", None, "{}").unwrap();
        db.insert_notification(&Uuid::new_v4().to_string(), &b, &a, "like", Some("p1"), "{}")
            .unwrap();

        assert_eq!(db.unread_notification_count(&b).unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read(&b).unwrap(), 2);
        assert_eq!(db.unread_notification_count(&b).unwrap(), 0);
        assert_eq!(db.mark_all_notifications_read(&b).unwrap(), 0);

        let row = db.get_notification(&n1).unwrap().unwrap();
        assert!(row.read_at.is_some());
    }

    #[test]
    fn retention_keeps_day_29_and_removes_day_31() {
        let db = test_db();
        let a = add_user(&db, "alice");
        let b = add_user(&db, "bob");

        let fresh = Uuid::new_v4().to_string();
        let stale = Uuid::new_v4().to_string();
        db.insert_notification(&fresh, &b, &a, "follow", None, "{}").unwrap();
        db.insert_notification(&stale, &b, &a, "follow", None, "{}").unwrap();

        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE notifications SET created_at = datetime('now', '-29 days') WHERE id = ?1",
                [&fresh],
            )?;
            conn.execute(
                "UPDATE notifications SET created_at = datetime('now', '-31 days') WHERE id = ?1",
                [&stale],
            )?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.delete_notifications_older_than(30).unwrap(), 1);
        assert!(db.get_notification(&fresh).unwrap().is_some());
        assert!(db.get_notification(&stale).unwrap().is_none());
    }
}
