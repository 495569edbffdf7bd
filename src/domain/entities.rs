//! Domain entities mirrored from persistent storage.
//!
//! Records carry the aggregate counts their queries annotate them with
//! (comment, like and post counts). Those counts are always computed by the
//! store at query time and never persisted on the row itself.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub published_at: OffsetDateTime,
    pub author_id: Uuid,
    pub comments_count: i64,
    pub likes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub title: String,
    pub posts_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub published_at: OffsetDateTime,
}

/// External user entity. Referenced by posts and comments, never owned here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub id: Uuid,
    pub username: String,
}
