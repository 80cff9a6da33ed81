use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use tubeline_types::models::{ChannelProfile, Video};

use super::{OptionalExt, VIDEO_SELECT, video_from_row};
use crate::Database;
use crate::models::{NewUser, UserRow, ts_at, uuid_at};

const USER_COLUMNS: &str = "id, username, email, fullname, password, avatar, avatar_handle, \
     cover_image, cover_image_handle, refresh_token, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, fullname, password, avatar, avatar_handle, cover_image, cover_image_handle)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.fullname,
                    user.password_hash,
                    user.avatar,
                    user.avatar_handle,
                    user.cover_image,
                    user.cover_image_handle,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id.to_string()))
    }

    /// Any account already holding `username` or `email`.
    pub fn find_user_by_username_or_email(&self, username: &str, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM users WHERE username = ?1 OR email = ?2 COLLATE NOCASE LIMIT 1",
                    USER_COLUMNS
                ),
                params![username, email],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn email_taken_by_other(&self, email: &str, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE AND id != ?2)",
                params![email, user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    /// Overwrites (or clears) the single stored refresh token.
    pub fn set_refresh_token(&self, user_id: Uuid, token: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET refresh_token = ?1 WHERE id = ?2",
                params![token, user_id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET password = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
                params![password_hash, user_id.to_string()],
            )?;
            Ok(())
        })
    }

    /// `None` fields keep their current value.
    pub fn update_account(
        &self,
        user_id: Uuid,
        fullname: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRow>> {
        let id = user_id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET fullname = COALESCE(?1, fullname), email = COALESCE(?2, email),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![fullname, email, id],
            )?;
            query_user(conn, "id = ?1", &id)
        })
    }

    /// Replace the avatar; returns the previous handle so the caller can
    /// delete the old asset.
    pub fn set_avatar(&self, user_id: Uuid, url: &str, handle: Option<&str>) -> Result<Option<String>> {
        self.replace_image(user_id, "avatar", url, handle)
    }

    pub fn set_cover_image(&self, user_id: Uuid, url: &str, handle: Option<&str>) -> Result<Option<String>> {
        self.replace_image(user_id, "cover_image", url, handle)
    }

    fn replace_image(
        &self,
        user_id: Uuid,
        column: &'static str,
        url: &str,
        handle: Option<&str>,
    ) -> Result<Option<String>> {
        let id = user_id.to_string();
        self.with_conn_mut(|conn| {
            let previous: Option<String> = conn.query_row(
                &format!("SELECT {}_handle FROM users WHERE id = ?1", column),
                [&id],
                |row| row.get(0),
            )?;
            conn.execute(
                &format!(
                    "UPDATE users SET {col} = ?1, {col}_handle = ?2,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    col = column
                ),
                params![url, handle, id],
            )?;
            Ok(previous)
        })
    }

    // -- Channel --

    pub fn get_channel_profile(&self, username: &str, viewer: Option<Uuid>) -> Result<Option<ChannelProfile>> {
        let viewer = viewer.map(|v| v.to_string());
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {},
                        (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = users.id),
                        (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = users.id),
                        EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel_id = users.id AND s.subscriber_id = ?2)
                     FROM users WHERE username = ?1",
                    USER_COLUMNS
                ),
                params![username, viewer],
                |row| {
                    Ok(ChannelProfile {
                        user: user_from_row(row)?.into(),
                        subscribers_count: row.get(12)?,
                        channels_subscribed_to_count: row.get(13)?,
                        is_subscribed: row.get(14)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Watch history --

    /// Move `video_id` to the front of the user's history.
    pub fn record_watch(&self, user_id: Uuid, video_id: Uuid) -> Result<()> {
        let (uid, vid) = (user_id.to_string(), video_id.to_string());
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM watch_history WHERE user_id = ?1 AND video_id = ?2",
                params![uid, vid],
            )?;
            conn.execute(
                "INSERT INTO watch_history (user_id, video_id) VALUES (?1, ?2)",
                params![uid, vid],
            )?;
            Ok(())
        })
    }

    /// Most recent first.
    pub fn get_watch_history(&self, user_id: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} JOIN watch_history w ON w.video_id = v.id
                 WHERE w.user_id = ?1
                 ORDER BY w.watched_at DESC, w.rowid DESC",
                VIDEO_SELECT
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], video_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate))?;
    stmt.query_row([value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        fullname: row.get(3)?,
        password: row.get(4)?,
        avatar: row.get(5)?,
        avatar_handle: row.get(6)?,
        cover_image: row.get(7)?,
        cover_image_handle: row.get(8)?,
        refresh_token: row.get(9)?,
        created_at: ts_at(row, 10)?,
        updated_at: ts_at(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;

    #[test]
    fn lookup_by_username_and_email() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");

        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().username, "alice");
        assert!(db.get_user_by_id(uuid::Uuid::new_v4()).unwrap().is_none());

        assert!(db.find_user_by_username_or_email("alice", "x@y.z").unwrap().is_some());
        assert_eq!(
            db.find_user_by_username_or_email("zed", "ALICE@example.com").unwrap().unwrap().id,
            id
        );
        assert!(db.find_user_by_username_or_email("zed", "zed@example.com").unwrap().is_none());
    }

    #[test]
    fn refresh_token_is_overwritten_and_cleared() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");

        db.set_refresh_token(id, Some("first")).unwrap();
        db.set_refresh_token(id, Some("second")).unwrap();
        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(row.refresh_token.as_deref(), Some("second"));

        db.set_refresh_token(id, None).unwrap();
        assert!(db.get_user_by_id(id).unwrap().unwrap().refresh_token.is_none());
    }

    #[test]
    fn update_account_keeps_missing_fields() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");

        let row = db.update_account(id, Some("Alice Liddell"), None).unwrap().unwrap();
        assert_eq!(row.fullname, "Alice Liddell");
        assert_eq!(row.email, "alice@example.com");
    }

    #[test]
    fn avatar_replacement_returns_previous_handle() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");

        assert_eq!(db.set_avatar(id, "https://cdn/a1.png", Some("image:a1")).unwrap(), None);
        assert_eq!(
            db.set_avatar(id, "https://cdn/a2.png", Some("image:a2")).unwrap().as_deref(),
            Some("image:a1")
        );
        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().avatar, "https://cdn/a2.png");
    }

    #[test]
    fn watch_history_moves_rewatched_video_to_front() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let first = fixtures::video(&db, bob, "first");
        let second = fixtures::video(&db, bob, "second");

        db.record_watch(alice, first).unwrap();
        db.record_watch(alice, second).unwrap();
        db.record_watch(alice, first).unwrap();

        let history: Vec<_> = db.get_watch_history(alice).unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(history, vec![first, second]);
    }

    #[test]
    fn channel_profile_counts_subscriptions() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");

        db.toggle_subscription(uuid::Uuid::new_v4(), bob, alice).unwrap();

        let seen_by_bob = db.get_channel_profile("alice", Some(bob)).unwrap().unwrap();
        assert_eq!(seen_by_bob.subscribers_count, 1);
        assert_eq!(seen_by_bob.channels_subscribed_to_count, 0);
        assert!(seen_by_bob.is_subscribed);

        let anonymous = db.get_channel_profile("alice", None).unwrap().unwrap();
        assert!(!anonymous.is_subscribed);
        assert!(db.get_channel_profile("nobody", None).unwrap().is_none());
    }
}
