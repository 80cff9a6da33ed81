//! Database row types. These carry storage-only columns (password hash,
//! refresh token, media handles) that the public `tubeline-types` models omit.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use tubeline_types::models::User;

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: String,
    pub avatar_handle: Option<String>,
    pub cover_image: String,
    pub cover_image_handle: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            fullname: row.fullname,
            avatar: row.avatar,
            cover_image: row.cover_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub fullname: &'a str,
    pub password_hash: &'a str,
    pub avatar: &'a str,
    pub avatar_handle: Option<&'a str>,
    pub cover_image: &'a str,
    pub cover_image_handle: Option<&'a str>,
}

pub struct VideoRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub video_handle: Option<String>,
    pub thumbnail: String,
    pub thumbnail_handle: Option<String>,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRow {
    /// Unpublished videos exist only for their owner.
    pub fn visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_published || viewer == Some(self.owner_id)
    }
}

pub struct NewVideo<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub video_file: &'a str,
    pub video_handle: Option<&'a str>,
    pub thumbnail: &'a str,
    pub thumbnail_handle: Option<&'a str>,
    pub duration: f64,
}

/// Ownership record for a comment, tweet or playlist.
pub struct OwnedRow {
    pub id: Uuid,
    pub owner_id: Uuid,
}

/// Read a TEXT column holding a UUID.
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a TEXT timestamp column. Rows written through the schema defaults are
/// RFC 3339; bare `YYYY-MM-DD HH:MM:SS` values are accepted as UTC.
pub(crate) fn ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_row(owner_id: Uuid, is_published: bool) -> VideoRow {
        VideoRow {
            id: Uuid::new_v4(),
            owner_id,
            title: "t".into(),
            description: "d".into(),
            video_file: "v.mp4".into(),
            video_handle: None,
            thumbnail: "t.png".into(),
            thumbnail_handle: None,
            duration: 1.0,
            views: 0,
            is_published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unpublished_videos_are_visible_to_their_owner_only() {
        let owner = Uuid::new_v4();
        let hidden = video_row(owner, false);
        assert!(hidden.visible_to(Some(owner)));
        assert!(!hidden.visible_to(Some(Uuid::new_v4())));
        assert!(!hidden.visible_to(None));
        assert!(video_row(owner, true).visible_to(None));
    }

    #[test]
    fn parses_both_timestamp_shapes() {
        let a = parse_timestamp("2025-01-02T03:04:05.678Z").unwrap();
        let b = parse_timestamp("2025-01-02 03:04:05").unwrap();
        assert_eq!(a.timestamp(), b.timestamp());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
