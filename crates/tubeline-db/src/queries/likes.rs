use anyhow::Result;
use rusqlite::params;
use uuid::Uuid;

use tubeline_types::models::Video;

use super::{OptionalExt, VIDEO_SELECT, video_from_row};
use crate::Database;

/// The single thing a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    fn column(&self) -> &'static str {
        match self {
            Self::Video(_) => "video_id",
            Self::Comment(_) => "comment_id",
            Self::Tweet(_) => "tweet_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            Self::Video(id) | Self::Comment(id) | Self::Tweet(id) => *id,
        }
    }
}

impl Database {
    // -- Likes --

    /// Toggle a like: removes if exists, inserts if not.
    /// Returns true when the like now exists.
    pub fn toggle_like(&self, id: Uuid, target: LikeTarget, user_id: Uuid) -> Result<bool> {
        let column = target.column();
        let target_id = target.id().to_string();
        let user_id = user_id.to_string();

        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    &format!("SELECT id FROM likes WHERE {} = ?1 AND liked_by = ?2", column),
                    params![target_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    &format!("INSERT INTO likes (id, {}, liked_by) VALUES (?1, ?2, ?3)", column),
                    params![id.to_string(), target_id, user_id],
                )?;
                Ok(true)
            }
        })
    }

    /// Published videos the user has liked, most recently liked first.
    pub fn get_liked_videos(&self, user_id: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} JOIN likes lk ON lk.video_id = v.id
                 WHERE lk.liked_by = ?1 AND v.is_published = 1
                 ORDER BY lk.created_at DESC, lk.rowid DESC",
                VIDEO_SELECT
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], video_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn toggling_twice_restores_unliked_state() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "v");

        assert!(db.toggle_like(Uuid::new_v4(), LikeTarget::Video(video), alice).unwrap());
        assert_eq!(db.get_video(video).unwrap().unwrap().likes, 1);

        assert!(!db.toggle_like(Uuid::new_v4(), LikeTarget::Video(video), alice).unwrap());
        assert_eq!(db.get_video(video).unwrap().unwrap().likes, 0);
    }

    #[test]
    fn liked_videos_lists_only_the_users_likes() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let v1 = fixtures::video(&db, alice, "one");
        let v2 = fixtures::video(&db, alice, "two");

        db.toggle_like(Uuid::new_v4(), LikeTarget::Video(v1), bob).unwrap();
        db.toggle_like(Uuid::new_v4(), LikeTarget::Video(v2), alice).unwrap();

        let liked: Vec<_> = db.get_liked_videos(bob).unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(liked, vec![v1]);
    }

    #[test]
    fn schema_rejects_like_without_exactly_one_target() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "v");
        let tweet = db.insert_tweet(Uuid::new_v4(), alice, "hello").unwrap();

        let none = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (id, liked_by) VALUES (?1, ?2)",
                params![Uuid::new_v4().to_string(), alice.to_string()],
            )?;
            Ok(())
        });
        assert!(none.is_err());

        let both = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (id, video_id, tweet_id, liked_by) VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    video.to_string(),
                    tweet.id.to_string(),
                    alice.to_string()
                ],
            )?;
            Ok(())
        });
        assert!(both.is_err());
    }
}
