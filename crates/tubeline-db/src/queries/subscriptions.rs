use anyhow::Result;
use rusqlite::params;
use uuid::Uuid;

use tubeline_types::models::SubscriptionEntry;

use super::{OptionalExt, summary_from_row};
use crate::Database;
use crate::models::ts_at;

impl Database {
    // -- Subscriptions --

    /// Subscribe if not subscribed, unsubscribe otherwise.
    /// Returns true when the subscription now exists.
    pub fn toggle_subscription(&self, id: Uuid, subscriber_id: Uuid, channel_id: Uuid) -> Result<bool> {
        let (sid, cid) = (subscriber_id.to_string(), channel_id.to_string());
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
                    params![sid, cid],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM subscriptions WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO subscriptions (id, subscriber_id, channel_id) VALUES (?1, ?2, ?3)",
                    params![id.to_string(), sid, cid],
                )?;
                Ok(true)
            }
        })
    }

    /// Users subscribed to `channel_id`, newest first.
    pub fn get_channel_subscribers(&self, channel_id: Uuid) -> Result<Vec<SubscriptionEntry>> {
        self.subscription_edges(
            "SELECT u.id, u.username, u.fullname, u.avatar, s.created_at
             FROM subscriptions s JOIN users u ON u.id = s.subscriber_id
             WHERE s.channel_id = ?1
             ORDER BY s.created_at DESC, s.rowid DESC",
            channel_id,
        )
    }

    /// Channels `subscriber_id` subscribes to, newest first.
    pub fn get_subscribed_channels(&self, subscriber_id: Uuid) -> Result<Vec<SubscriptionEntry>> {
        self.subscription_edges(
            "SELECT u.id, u.username, u.fullname, u.avatar, s.created_at
             FROM subscriptions s JOIN users u ON u.id = s.channel_id
             WHERE s.subscriber_id = ?1
             ORDER BY s.created_at DESC, s.rowid DESC",
            subscriber_id,
        )
    }

    fn subscription_edges(&self, sql: &str, id: Uuid) -> Result<Vec<SubscriptionEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([id.to_string()], |row| {
                    Ok(SubscriptionEntry {
                        user: summary_from_row(row, 0)?,
                        subscribed_at: ts_at(row, 4)?,
                    })
                })?
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
    fn toggle_and_list_both_directions() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let carol = fixtures::user(&db, "carol");

        assert!(db.toggle_subscription(Uuid::new_v4(), bob, alice).unwrap());
        assert!(db.toggle_subscription(Uuid::new_v4(), carol, alice).unwrap());

        let subscribers = db.get_channel_subscribers(alice).unwrap();
        assert_eq!(subscribers.len(), 2);
        assert_eq!(subscribers[0].user.username, "carol");

        let channels = db.get_subscribed_channels(bob).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].user.id, alice);

        assert!(!db.toggle_subscription(Uuid::new_v4(), bob, alice).unwrap());
        assert_eq!(db.get_channel_subscribers(alice).unwrap().len(), 1);
    }

    #[test]
    fn schema_rejects_self_subscription() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        assert!(db.toggle_subscription(Uuid::new_v4(), alice, alice).is_err());
    }
}
