use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

use tubeline_types::api::{SortField, VideoSort};
use tubeline_types::models::{Page, Video};

use super::{OptionalExt, VIDEO_SELECT, page_window, video_from_row};
use crate::Database;
use crate::models::{NewVideo, VideoRow, ts_at, uuid_at};

const VIDEO_ROW_COLUMNS: &str = "id, owner_id, title, description, video_file, video_handle, \
     thumbnail, thumbnail_handle, duration, views, is_published, created_at, updated_at";

/// Published-video listing parameters.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring matched against title and description.
    pub query: Option<String>,
    pub owner: Option<Uuid>,
    pub sort: VideoSort,
    pub page: u32,
    pub limit: u32,
}

/// Changes applied by `update_video`; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct VideoUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub thumbnail: Option<&'a str>,
    pub thumbnail_handle: Option<&'a str>,
}

impl Database {
    // -- Videos --

    pub fn insert_video(&self, video: &NewVideo<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO videos (id, owner_id, title, description, video_file, video_handle, thumbnail, thumbnail_handle, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    video.id.to_string(),
                    video.owner_id.to_string(),
                    video.title,
                    video.description,
                    video.video_file,
                    video.video_handle,
                    video.thumbnail,
                    video.thumbnail_handle,
                    video.duration,
                ],
            )?;
            Ok(())
        })
    }

    /// Raw row, including media handles, for ownership checks and cleanup.
    pub fn get_video_row(&self, id: Uuid) -> Result<Option<VideoRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_ROW_COLUMNS),
                [id.to_string()],
                video_row_from_row,
            )
            .optional()
        })
    }

    /// Video with owner summary and like count, regardless of publish state.
    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{} WHERE v.id = ?1", VIDEO_SELECT),
                [id.to_string()],
                video_from_row,
            )
            .optional()
        })
    }

    pub fn search_videos(&self, filter: &VideoFilter) -> Result<Page<Video>> {
        let pattern = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));
        let owner = filter.owner.map(|o| o.to_string());
        let (limit, offset) = page_window(filter.page, filter.limit);

        let where_clause = "WHERE v.is_published = 1
               AND (?1 IS NULL OR v.title LIKE ?1 ESCAPE '\\' OR v.description LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR v.owner_id = ?2)";
        let direction = if filter.sort.ascending { "ASC" } else { "DESC" };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM videos v {}", where_clause),
                params![pattern, owner],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "{select} {where_clause} ORDER BY {column} {dir}, v.rowid {dir} LIMIT ?3 OFFSET ?4",
                select = VIDEO_SELECT,
                where_clause = where_clause,
                column = sort_column(filter.sort.field),
                dir = direction,
            ))?;
            let docs = stmt
                .query_map(params![pattern, owner, limit, offset], video_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Page::new(docs, total, filter.page.max(1), filter.limit))
        })
    }

    pub fn increment_views(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    pub fn update_video(&self, id: Uuid, update: &VideoUpdate<'_>) -> Result<Option<Video>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE videos SET
                     title = COALESCE(?1, title),
                     description = COALESCE(?2, description),
                     thumbnail = COALESCE(?3, thumbnail),
                     thumbnail_handle = CASE WHEN ?3 IS NULL THEN thumbnail_handle ELSE ?4 END,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?5",
                params![update.title, update.description, update.thumbnail, update.thumbnail_handle, id],
            )?;
            conn.query_row(&format!("{} WHERE v.id = ?1", VIDEO_SELECT), [&id], video_from_row)
                .optional()
        })
    }

    /// Flip the published flag. Returns the new value, or `None` if the video
    /// does not exist.
    pub fn toggle_published(&self, id: Uuid) -> Result<Option<bool>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE videos SET is_published = NOT is_published,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                [&id],
            )?;
            conn.query_row("SELECT is_published FROM videos WHERE id = ?1", [&id], |row| row.get(0))
                .optional()
        })
    }

    /// Deletes the video; likes, comments, playlist entries and history rows
    /// referencing it go with it.
    pub fn delete_video(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM videos WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    /// Every video of a channel, published or not, newest first.
    pub fn get_channel_videos(&self, owner_id: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE v.owner_id = ?1 ORDER BY v.created_at DESC, v.rowid DESC",
                VIDEO_SELECT
            ))?;
            let rows = stmt
                .query_map([owner_id.to_string()], video_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Title => "v.title COLLATE NOCASE",
        SortField::Views => "v.views",
        SortField::Likes => "likes",
        SortField::Duration => "v.duration",
        SortField::CreatedAt => "v.created_at",
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn video_row_from_row(row: &Row<'_>) -> rusqlite::Result<VideoRow> {
    Ok(VideoRow {
        id: uuid_at(row, 0)?,
        owner_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_file: row.get(4)?,
        video_handle: row.get(5)?,
        thumbnail: row.get(6)?,
        thumbnail_handle: row.get(7)?,
        duration: row.get(8)?,
        views: row.get(9)?,
        is_published: row.get(10)?,
        created_at: ts_at(row, 11)?,
        updated_at: ts_at(row, 12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    fn filter(query: Option<&str>) -> VideoFilter {
        VideoFilter {
            query: query.map(String::from),
            page: 1,
            limit: 10,
            ..Default::default()
        }
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        fixtures::video(&db, alice, "Rust Ownership Explained");
        fixtures::video(&db, alice, "Cooking pasta");

        let page = db.search_videos(&filter(Some("rust"))).unwrap();
        assert_eq!(page.total_docs, 1);
        assert_eq!(page.docs[0].title, "Rust Ownership Explained");
        assert_eq!(page.docs[0].owner.username, "alice");

        // every fixture shares the description
        let page = db.search_videos(&filter(Some("DESCRIPTION"))).unwrap();
        assert_eq!(page.total_docs, 2);
    }

    #[test]
    fn search_without_matches_is_an_empty_page() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        fixtures::video(&db, alice, "Cooking pasta");

        let page = db.search_videos(&filter(Some("zzz"))).unwrap();
        assert_eq!(page.total_docs, 0);
        assert!(page.docs.is_empty());
        assert!(!page.has_next_page);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        fixtures::video(&db, alice, "100% pure");
        fixtures::video(&db, alice, "plain");

        assert_eq!(db.search_videos(&filter(Some("%"))).unwrap().total_docs, 1);
    }

    #[test]
    fn unpublished_videos_are_hidden_from_search() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let id = fixtures::video(&db, alice, "secret");

        assert_eq!(db.toggle_published(id).unwrap(), Some(false));
        assert_eq!(db.search_videos(&filter(None)).unwrap().total_docs, 0);
        assert_eq!(db.get_channel_videos(alice).unwrap().len(), 1);

        assert_eq!(db.toggle_published(id).unwrap(), Some(true));
        assert_eq!(db.toggle_published(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn sorting_and_paging() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        for title in ["b", "c", "a"] {
            fixtures::video(&db, alice, title);
        }

        let mut f = filter(None);
        f.sort = VideoSort::from_params(Some("title"), Some("asc"));
        f.limit = 2;
        let first = db.search_videos(&f).unwrap();
        let titles: Vec<_> = first.docs.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next_page);

        f.page = 2;
        let second = db.search_videos(&f).unwrap();
        assert_eq!(second.docs.len(), 1);
        assert_eq!(second.docs[0].title, "c");
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let id = fixtures::video(&db, alice, "old");

        let video = db
            .update_video(
                id,
                &VideoUpdate {
                    title: Some("new"),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(video.title, "new");
        assert_eq!(video.thumbnail, "https://cdn.test/t.png");
        let row = db.get_video_row(id).unwrap().unwrap();
        assert_eq!(row.thumbnail_handle.as_deref(), Some("image:t"));
    }

    #[test]
    fn delete_cascades_to_dependents() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let id = fixtures::video(&db, alice, "doomed");
        db.toggle_like(Uuid::new_v4(), crate::LikeTarget::Video(id), bob).unwrap();
        db.record_watch(bob, id).unwrap();

        assert!(db.delete_video(id).unwrap());
        assert!(db.get_video(id).unwrap().is_none());
        assert!(db.get_watch_history(bob).unwrap().is_empty());
        assert!(!db.delete_video(id).unwrap());
    }
}
