//! Repository traits describing persistence adapters.
//!
//! Every method returns fully aggregated rows in a single round-trip: the
//! post listings carry their comment/like counts, the tag listings carry
//! their post counts, and the `*_for_posts` methods exist so callers can
//! resolve a whole page of related records with one query per relation.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{AuthorRecord, CommentRecord, PostRecord, TagRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// A tag attached to a specific post, as produced by the batched
/// tags-for-posts query.
#[derive(Debug, Clone, PartialEq)]
pub struct PostTag {
    pub post_id: Uuid,
    pub tag: TagRecord,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts ordered by like count descending, slug ascending on ties.
    async fn list_popular(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    /// Posts ordered by publication timestamp descending, slug ascending
    /// on ties.
    async fn list_fresh(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    /// Posts carrying the given tag, freshest first.
    async fn list_for_tag(&self, tag_id: Uuid, limit: u32)
    -> Result<Vec<PostRecord>, RepoError>;

    /// Looks a post up by its unique slug. A second matching row means the
    /// uniqueness constraint has been lost and surfaces as
    /// [`RepoError::Integrity`], never as an arbitrary pick.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Tags ordered by post count descending, title ascending on ties.
    async fn list_popular(&self, limit: u32) -> Result<Vec<TagRecord>, RepoError>;

    /// All tags attached to any of the given posts, in one query, each tag
    /// annotated with its own post count. Ordered by post id, then title
    /// ascending; the first tag per post in this order is the post's
    /// "first tag".
    async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTag>, RepoError>;

    /// Looks a tag up by its unique title, with the same non-unique-match
    /// handling as [`PostsRepo::find_by_slug`].
    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// A post's comments in publication order (timestamp, then id).
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    /// Resolves a batch of author ids in one query. Order is unspecified;
    /// callers join by id.
    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>, RepoError>;
}
