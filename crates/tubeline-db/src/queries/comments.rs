use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use tubeline_types::models::{Comment, Page};

use super::{OptionalExt, page_window, summary_from_row};
use crate::Database;
use crate::models::{OwnedRow, ts_at, uuid_at};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.content, c.video_id,
           (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS likes,
           c.created_at, c.updated_at,
           u.id, u.username, u.fullname, u.avatar
    FROM comments c
    JOIN users u ON u.id = c.owner_id";

impl Database {
    // -- Comments --

    pub fn insert_comment(&self, id: Uuid, video_id: Uuid, owner_id: Uuid, content: &str) -> Result<Comment> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, video_id, owner_id, content) VALUES (?1, ?2, ?3, ?4)",
                params![id, video_id.to_string(), owner_id.to_string(), content],
            )?;
            query_comment(conn, &id)?.ok_or_else(|| anyhow::anyhow!("comment {} vanished after insert", id))
        })
    }

    pub fn get_comment_owner(&self, id: Uuid) -> Result<Option<OwnedRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id FROM comments WHERE id = ?1",
                [id.to_string()],
                |row| Ok(OwnedRow { id: uuid_at(row, 0)?, owner_id: uuid_at(row, 1)? }),
            )
            .optional()
        })
    }

    /// Newest first.
    pub fn get_video_comments(&self, video_id: Uuid, page: u32, limit: u32) -> Result<Page<Comment>> {
        let vid = video_id.to_string();
        let (lim, offset) = page_window(page, limit);
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
                [&vid],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&format!(
                "{} WHERE c.video_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC LIMIT ?2 OFFSET ?3",
                COMMENT_SELECT
            ))?;
            let docs = stmt
                .query_map(params![vid, lim, offset], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Page::new(docs, total, page.max(1), limit))
        })
    }

    pub fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE comments SET content = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
                params![content, id],
            )?;
            query_comment(conn, &id)
        })
    }

    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<Comment>> {
    conn.query_row(&format!("{} WHERE c.id = ?1", COMMENT_SELECT), [id], comment_from_row)
        .optional()
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: uuid_at(row, 0)?,
        content: row.get(1)?,
        video: uuid_at(row, 2)?,
        likes: row.get(3)?,
        created_at: ts_at(row, 4)?,
        updated_at: ts_at(row, 5)?,
        owner: summary_from_row(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::LikeTarget;

    #[test]
    fn comments_page_newest_first_with_author() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let video = fixtures::video(&db, alice, "v");

        for i in 0..3 {
            db.insert_comment(Uuid::new_v4(), video, bob, &format!("comment {}", i)).unwrap();
        }

        let page = db.get_video_comments(video, 1, 2).unwrap();
        assert_eq!(page.total_docs, 3);
        assert_eq!(page.docs.len(), 2);
        assert_eq!(page.docs[0].content, "comment 2");
        assert_eq!(page.docs[0].owner.username, "bob");
        assert!(page.has_next_page);
    }

    #[test]
    fn update_and_delete() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "v");
        let comment = db.insert_comment(Uuid::new_v4(), video, alice, "first").unwrap();

        let owner = db.get_comment_owner(comment.id).unwrap().unwrap();
        assert_eq!(owner.owner_id, alice);

        db.toggle_like(Uuid::new_v4(), LikeTarget::Comment(comment.id), alice).unwrap();
        let updated = db.update_comment(comment.id, "edited").unwrap().unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.likes, 1);

        assert!(db.delete_comment(comment.id).unwrap());
        assert!(db.get_comment_owner(comment.id).unwrap().is_none());
    }

    #[test]
    fn blank_content_is_rejected_by_schema() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "v");
        assert!(db.insert_comment(Uuid::new_v4(), video, alice, "   ").is_err());
    }
}
