use anyhow::Result;
use uuid::Uuid;

use tubeline_types::models::ChannelStats;

use crate::Database;

impl Database {
    // -- Dashboard --

    /// Aggregates for a channel. Views count unpublished videos too;
    /// likes cover the channel's videos, comments and tweets.
    pub fn channel_stats(&self, owner_id: Uuid) -> Result<ChannelStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM videos WHERE owner_id = ?1),
                    (SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?1),
                    (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1),
                    (SELECT COUNT(*) FROM likes l
                        LEFT JOIN videos v ON v.id = l.video_id
                        LEFT JOIN comments c ON c.id = l.comment_id
                        LEFT JOIN tweets t ON t.id = l.tweet_id
                        WHERE v.owner_id = ?1 OR c.owner_id = ?1 OR t.owner_id = ?1)",
                [owner_id.to_string()],
                |row| {
                    Ok(ChannelStats {
                        total_videos: row.get(0)?,
                        total_views: row.get(1)?,
                        total_subscribers: row.get(2)?,
                        total_likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::LikeTarget;

    #[test]
    fn empty_channel_has_zero_stats() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        assert_eq!(db.channel_stats(alice).unwrap(), ChannelStats::default());
    }

    #[test]
    fn stats_cover_only_the_channels_content() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let video = fixtures::video(&db, alice, "one");
        fixtures::video(&db, alice, "two");
        let bobs_video = fixtures::video(&db, bob, "bob's");

        db.increment_views(video).unwrap();
        db.increment_views(video).unwrap();
        db.increment_views(bobs_video).unwrap();

        db.toggle_subscription(Uuid::new_v4(), bob, alice).unwrap();

        let comment = db.insert_comment(Uuid::new_v4(), bobs_video, alice, "nice").unwrap();
        let tweet = db.insert_tweet(Uuid::new_v4(), alice, "hello").unwrap();
        db.toggle_like(Uuid::new_v4(), LikeTarget::Video(video), bob).unwrap();
        db.toggle_like(Uuid::new_v4(), LikeTarget::Comment(comment.id), bob).unwrap();
        db.toggle_like(Uuid::new_v4(), LikeTarget::Tweet(tweet.id), bob).unwrap();
        db.toggle_like(Uuid::new_v4(), LikeTarget::Video(bobs_video), alice).unwrap();

        let stats = db.channel_stats(alice).unwrap();
        assert_eq!(
            stats,
            ChannelStats { total_videos: 2, total_views: 2, total_subscribers: 1, total_likes: 3 }
        );
    }
}
