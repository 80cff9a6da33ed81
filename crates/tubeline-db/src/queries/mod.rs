pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use anyhow::Result;
use rusqlite::Row;

use tubeline_types::models::{UserSummary, Video};

use crate::models::{ts_at, uuid_at};

/// Video joined with its owner's public summary and like count.
/// Column order is what `video_from_row` expects.
pub(crate) const VIDEO_SELECT: &str = "
    SELECT v.id, v.video_file, v.thumbnail, v.title, v.description, v.duration, v.views,
           (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS likes,
           v.is_published, v.created_at, v.updated_at,
           u.id, u.username, u.fullname, u.avatar
    FROM videos v
    JOIN users u ON u.id = v.owner_id";

pub(crate) fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: uuid_at(row, 0)?,
        video_file: row.get(1)?,
        thumbnail: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        duration: row.get(5)?,
        views: row.get(6)?,
        likes: row.get(7)?,
        is_published: row.get(8)?,
        created_at: ts_at(row, 9)?,
        updated_at: ts_at(row, 10)?,
        owner: summary_from_row(row, 11)?,
    })
}

/// Read `id, username, fullname, avatar` starting at column `start`.
pub(crate) fn summary_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: uuid_at(row, start)?,
        username: row.get(start + 1)?,
        fullname: row.get(start + 2)?,
        avatar: row.get(start + 3)?,
    })
}

/// `(limit, offset)` for a 1-based page.
pub(crate) fn page_window(page: u32, limit: u32) -> (i64, i64) {
    let page = page.max(1) as i64;
    let limit = limit as i64;
    (limit, (page - 1) * limit)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
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
pub(crate) mod fixtures {
    use uuid::Uuid;

    use crate::Database;
    use crate::models::{NewUser, NewVideo};

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", username);
        db.create_user(&NewUser {
            id,
            username,
            email: &email,
            fullname: username,
            password_hash: "hash",
            avatar: "https://cdn.test/avatar.png",
            avatar_handle: None,
            cover_image: "",
            cover_image_handle: None,
        })
        .unwrap();
        id
    }

    pub fn video(db: &Database, owner_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.insert_video(&NewVideo {
            id,
            owner_id,
            title,
            description: "a description",
            video_file: "https://cdn.test/v.mp4",
            video_handle: Some("video:v"),
            thumbnail: "https://cdn.test/t.png",
            thumbnail_handle: Some("image:t"),
            duration: 60.0,
        })
        .unwrap();
        id
    }
}
