use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. The password hash and refresh token never leave
/// the database layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner block embedded in videos, comments, tweets and playlists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds, as reported by the media host. Zero when unknown.
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub is_published: bool,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub video: Uuid,
    pub owner: UserSummary,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub owner: UserSummary,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: UserSummary,
    pub video_count: i64,
    pub total_views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A playlist together with its videos in playlist order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub videos: Vec<Video>,
}

/// A user seen as a publisher, with subscription counters relative to the
/// viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(flatten)]
    pub user: User,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// One side of a subscription edge: the other user plus when the edge was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    #[serde(flatten)]
    pub user: UserSummary,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_subscribers: i64,
    pub total_likes: i64,
}

/// Offset pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: i64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total_docs.max(0) as u64).div_ceil(limit as u64) as u32
        };
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_counts() {
        let page = Page::new(vec![1, 2, 3], 23, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);

        let last = Page::new(vec![1], 21, 3, 10);
        assert!(!last.has_next_page);

        let empty: Page<u8> = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }

    #[test]
    fn video_serializes_camel_case_with_mongo_style_id() {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            video_file: "https://cdn/v.mp4".into(),
            thumbnail: "https://cdn/t.png".into(),
            title: "t".into(),
            description: "d".into(),
            duration: 12.5,
            views: 3,
            likes: 1,
            is_published: true,
            owner: UserSummary {
                id: Uuid::new_v4(),
                username: "alice".into(),
                fullname: "Alice".into(),
                avatar: "https://cdn/a.png".into(),
            },
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&video).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["videoFile"], "https://cdn/v.mp4");
        assert_eq!(json["isPublished"], true);
        assert_eq!(json["owner"]["username"], "alice");
    }
}
