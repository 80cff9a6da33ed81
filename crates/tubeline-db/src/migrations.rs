use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                username            TEXT NOT NULL UNIQUE,
                email               TEXT NOT NULL UNIQUE,
                fullname            TEXT NOT NULL,
                password            TEXT NOT NULL,
                avatar              TEXT NOT NULL,
                avatar_handle       TEXT,
                cover_image         TEXT NOT NULL DEFAULT '',
                cover_image_handle  TEXT,
                refresh_token       TEXT,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE videos (
                id                  TEXT PRIMARY KEY,
                owner_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title               TEXT NOT NULL,
                description         TEXT NOT NULL,
                video_file          TEXT NOT NULL,
                video_handle        TEXT,
                thumbnail           TEXT NOT NULL,
                thumbnail_handle    TEXT,
                duration            REAL NOT NULL DEFAULT 0,
                views               INTEGER NOT NULL DEFAULT 0,
                is_published        INTEGER NOT NULL DEFAULT 1,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_videos_owner ON videos(owner_id, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL CHECK (length(trim(content)) > 0),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_comments_video ON comments(video_id, created_at);

            CREATE TABLE tweets (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL CHECK (length(content) BETWEEN 1 AND 280),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_tweets_owner ON tweets(owner_id, created_at);

            -- Exactly one of video_id / comment_id / tweet_id is set.
            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                video_id    TEXT REFERENCES videos(id) ON DELETE CASCADE,
                comment_id  TEXT REFERENCES comments(id) ON DELETE CASCADE,
                tweet_id    TEXT REFERENCES tweets(id) ON DELETE CASCADE,
                liked_by    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                CHECK ((video_id IS NOT NULL) + (comment_id IS NOT NULL) + (tweet_id IS NOT NULL) = 1),
                UNIQUE (liked_by, video_id),
                UNIQUE (liked_by, comment_id),
                UNIQUE (liked_by, tweet_id)
            );

            CREATE INDEX idx_likes_video ON likes(video_id);
            CREATE INDEX idx_likes_comment ON likes(comment_id);
            CREATE INDEX idx_likes_tweet ON likes(tweet_id);

            CREATE TABLE playlists (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE playlist_videos (
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                added_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (playlist_id, video_id)
            );

            CREATE TABLE subscriptions (
                id              TEXT PRIMARY KEY,
                subscriber_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                CHECK (subscriber_id != channel_id),
                UNIQUE (subscriber_id, channel_id)
            );

            CREATE INDEX idx_subscriptions_channel ON subscriptions(channel_id);

            CREATE TABLE watch_history (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                watched_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (user_id, video_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
