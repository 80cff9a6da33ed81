use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use tubeline_types::models::Tweet;

use super::{OptionalExt, summary_from_row};
use crate::Database;
use crate::models::{OwnedRow, ts_at, uuid_at};

const TWEET_SELECT: &str = "
    SELECT t.id, t.content,
           (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS likes,
           t.created_at, t.updated_at,
           u.id, u.username, u.fullname, u.avatar
    FROM tweets t
    JOIN users u ON u.id = t.owner_id";

impl Database {
    // -- Tweets --

    pub fn insert_tweet(&self, id: Uuid, owner_id: Uuid, content: &str) -> Result<Tweet> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, owner_id, content) VALUES (?1, ?2, ?3)",
                params![id, owner_id.to_string(), content],
            )?;
            query_tweet(conn, &id)?.ok_or_else(|| anyhow::anyhow!("tweet {} vanished after insert", id))
        })
    }

    pub fn get_tweet_owner(&self, id: Uuid) -> Result<Option<OwnedRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id FROM tweets WHERE id = ?1",
                [id.to_string()],
                |row| Ok(OwnedRow { id: uuid_at(row, 0)?, owner_id: uuid_at(row, 1)? }),
            )
            .optional()
        })
    }

    /// Newest first.
    pub fn get_user_tweets(&self, owner_id: Uuid) -> Result<Vec<Tweet>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE t.owner_id = ?1 ORDER BY t.created_at DESC, t.rowid DESC",
                TWEET_SELECT
            ))?;
            let rows = stmt
                .query_map([owner_id.to_string()], tweet_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_tweet(&self, id: Uuid, content: &str) -> Result<Option<Tweet>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE tweets SET content = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
                params![content, id],
            )?;
            query_tweet(conn, &id)
        })
    }

    pub fn delete_tweet(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM tweets WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }
}

fn query_tweet(conn: &Connection, id: &str) -> Result<Option<Tweet>> {
    conn.query_row(&format!("{} WHERE t.id = ?1", TWEET_SELECT), [id], tweet_from_row)
        .optional()
}

fn tweet_from_row(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: uuid_at(row, 0)?,
        content: row.get(1)?,
        likes: row.get(2)?,
        created_at: ts_at(row, 3)?,
        updated_at: ts_at(row, 4)?,
        owner: summary_from_row(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn tweets_round_trip_through_owner_listing() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");

        let first = db.insert_tweet(Uuid::new_v4(), alice, "first").unwrap();
        db.insert_tweet(Uuid::new_v4(), alice, "second").unwrap();
        db.insert_tweet(Uuid::new_v4(), bob, "bob's").unwrap();

        let tweets = db.get_user_tweets(alice).unwrap();
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].content, "second");
        assert_eq!(tweets[1].owner.username, "alice");

        let edited = db.update_tweet(first.id, "edited").unwrap().unwrap();
        assert_eq!(edited.content, "edited");
        assert_eq!(db.get_tweet_owner(first.id).unwrap().unwrap().owner_id, alice);

        assert!(db.delete_tweet(first.id).unwrap());
        assert!(db.get_tweet_owner(first.id).unwrap().is_none());
    }

    #[test]
    fn schema_bounds_tweet_length() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        assert!(db.insert_tweet(Uuid::new_v4(), alice, &"x".repeat(280)).is_ok());
        assert!(db.insert_tweet(Uuid::new_v4(), alice, &"x".repeat(281)).is_err());
    }
}
