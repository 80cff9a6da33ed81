use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use tubeline_types::models::{Playlist, PlaylistDetail};

use super::{OptionalExt, VIDEO_SELECT, summary_from_row, video_from_row};
use crate::Database;
use crate::models::{OwnedRow, ts_at, uuid_at};

const PLAYLIST_SELECT: &str = "
    SELECT p.id, p.name, p.description,
           (SELECT COUNT(*) FROM playlist_videos pv
                JOIN videos v ON v.id = pv.video_id
                WHERE pv.playlist_id = p.id AND v.is_published = 1) AS video_count,
           (SELECT COALESCE(SUM(v.views), 0) FROM playlist_videos pv
                JOIN videos v ON v.id = pv.video_id
                WHERE pv.playlist_id = p.id AND v.is_published = 1) AS total_views,
           p.created_at, p.updated_at,
           u.id, u.username, u.fullname, u.avatar
    FROM playlists p
    JOIN users u ON u.id = p.owner_id";

impl Database {
    // -- Playlists --

    /// Playlist names are unique across all users.
    pub fn playlist_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool> {
        let exclude = exclude.map(|id| id.to_string());
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM playlists WHERE name = ?1 AND (?2 IS NULL OR id != ?2))",
                params![name, exclude],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn insert_playlist(&self, id: Uuid, owner_id: Uuid, name: &str, description: &str) -> Result<Playlist> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, name, description, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, description, owner_id.to_string()],
            )?;
            query_playlist(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("playlist {} vanished after insert", id))
        })
    }

    pub fn get_playlist_owner(&self, id: Uuid) -> Result<Option<OwnedRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id FROM playlists WHERE id = ?1",
                [id.to_string()],
                |row| Ok(OwnedRow { id: uuid_at(row, 0)?, owner_id: uuid_at(row, 1)? }),
            )
            .optional()
        })
    }

    /// Playlist with its videos in insertion order. Unpublished videos are
    /// listed only for their own owner; the counts cover published videos.
    pub fn get_playlist_detail(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<PlaylistDetail>> {
        let id = id.to_string();
        let viewer = viewer.map(|v| v.to_string());
        self.with_conn(|conn| {
            let Some(playlist) = query_playlist(conn, &id)? else {
                return Ok(None);
            };
            let mut stmt = conn.prepare(&format!(
                "{} JOIN playlist_videos pv ON pv.video_id = v.id
                 WHERE pv.playlist_id = ?1 AND (v.is_published = 1 OR v.owner_id = ?2)
                 ORDER BY pv.position",
                VIDEO_SELECT
            ))?;
            let videos = stmt
                .query_map(params![id, viewer], video_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Some(PlaylistDetail { playlist, videos }))
        })
    }

    pub fn get_user_playlists(&self, owner_id: Uuid) -> Result<Vec<Playlist>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE p.owner_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC",
                PLAYLIST_SELECT
            ))?;
            let rows = stmt
                .query_map([owner_id.to_string()], playlist_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `None` fields keep their current value.
    pub fn update_playlist(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Playlist>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE playlists SET name = COALESCE(?1, name), description = COALESCE(?2, description),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![name, description, id],
            )?;
            query_playlist(conn, &id)
        })
    }

    pub fn delete_playlist(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM playlists WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    /// Append a video unless it is already present. Returns true if added.
    pub fn add_video_to_playlist(&self, playlist_id: Uuid, video_id: Uuid) -> Result<bool> {
        let (pid, vid) = (playlist_id.to_string(), video_id.to_string());
        self.with_conn_mut(|conn| {
            let added = conn.execute(
                "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM playlist_videos WHERE playlist_id = ?1))",
                params![pid, vid],
            )?;
            if added > 0 {
                touch_playlist(conn, &pid)?;
            }
            Ok(added > 0)
        })
    }

    /// Returns true if the video was in the playlist.
    pub fn remove_video_from_playlist(&self, playlist_id: Uuid, video_id: Uuid) -> Result<bool> {
        let (pid, vid) = (playlist_id.to_string(), video_id.to_string());
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                params![pid, vid],
            )?;
            if removed > 0 {
                touch_playlist(conn, &pid)?;
            }
            Ok(removed > 0)
        })
    }
}

fn touch_playlist(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE playlists SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
        [id],
    )?;
    Ok(())
}

fn query_playlist(conn: &Connection, id: &str) -> Result<Option<Playlist>> {
    conn.query_row(&format!("{} WHERE p.id = ?1", PLAYLIST_SELECT), [id], playlist_from_row)
        .optional()
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        video_count: row.get(3)?,
        total_views: row.get(4)?,
        created_at: ts_at(row, 5)?,
        updated_at: ts_at(row, 6)?,
        owner: summary_from_row(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn membership_is_a_set_in_insertion_order() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let v1 = fixtures::video(&db, alice, "one");
        let v2 = fixtures::video(&db, alice, "two");
        let playlist = db.insert_playlist(Uuid::new_v4(), alice, "mix", "stuff").unwrap();
        assert_eq!(playlist.video_count, 0);

        assert!(db.add_video_to_playlist(playlist.id, v2).unwrap());
        assert!(db.add_video_to_playlist(playlist.id, v1).unwrap());
        assert!(!db.add_video_to_playlist(playlist.id, v2).unwrap());

        let detail = db.get_playlist_detail(playlist.id, None).unwrap().unwrap();
        let order: Vec<_> = detail.videos.iter().map(|v| v.id).collect();
        assert_eq!(order, vec![v2, v1]);
        assert_eq!(detail.playlist.video_count, 2);

        assert!(db.remove_video_from_playlist(playlist.id, v2).unwrap());
        assert!(!db.remove_video_from_playlist(playlist.id, v2).unwrap());
        let detail = db.get_playlist_detail(playlist.id, None).unwrap().unwrap();
        assert_eq!(detail.playlist.video_count, 1);
    }

    #[test]
    fn names_are_unique() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let p = db.insert_playlist(Uuid::new_v4(), alice, "mix", "stuff").unwrap();

        assert!(db.playlist_name_taken("mix", None).unwrap());
        assert!(!db.playlist_name_taken("mix", Some(p.id)).unwrap());
        assert!(db.insert_playlist(Uuid::new_v4(), bob, "mix", "dup").is_err());
    }

    #[test]
    fn update_list_and_delete() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let p = db.insert_playlist(Uuid::new_v4(), alice, "mix", "stuff").unwrap();

        let updated = db.update_playlist(p.id, None, Some("better stuff")).unwrap().unwrap();
        assert_eq!(updated.name, "mix");
        assert_eq!(updated.description, "better stuff");

        assert_eq!(db.get_user_playlists(alice).unwrap().len(), 1);
        assert!(db.delete_playlist(p.id).unwrap());
        assert!(db.get_user_playlists(alice).unwrap().is_empty());
        assert!(db.get_playlist_detail(p.id, None).unwrap().is_none());
    }

    #[test]
    fn unpublished_videos_are_hidden_from_other_viewers() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let public = fixtures::video(&db, alice, "public");
        let hidden = fixtures::video(&db, alice, "hidden");
        db.toggle_published(hidden).unwrap();

        let p = db.insert_playlist(Uuid::new_v4(), bob, "mix", "stuff").unwrap();
        db.add_video_to_playlist(p.id, public).unwrap();
        db.add_video_to_playlist(p.id, hidden).unwrap();

        for viewer in [None, Some(bob)] {
            let detail = db.get_playlist_detail(p.id, viewer).unwrap().unwrap();
            let ids: Vec<_> = detail.videos.iter().map(|v| v.id).collect();
            assert_eq!(ids, vec![public]);
            assert_eq!(detail.playlist.video_count, 1);
        }

        let own = db.get_playlist_detail(p.id, Some(alice)).unwrap().unwrap();
        assert_eq!(own.videos.len(), 2);
    }
}
