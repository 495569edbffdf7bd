use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{PostsRepo, RepoError},
    domain::entities::PostRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    slug: String,
    title: String,
    body: String,
    image_url: Option<String>,
    published_at: OffsetDateTime,
    author_id: Uuid,
    comments_count: i64,
    likes_count: i64,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            body: row.body,
            image_url: row.image_url,
            published_at: row.published_at,
            author_id: row.author_id,
            comments_count: row.comments_count,
            likes_count: row.likes_count,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_popular(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            "SELECT p.id, p.slug, p.title, p.body, p.image_url, p.published_at, p.author_id, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count \
             FROM posts p \
             ORDER BY likes_count DESC, p.slug ASC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_fresh(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            "SELECT p.id, p.slug, p.title, p.body, p.image_url, p.published_at, p.author_id, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count \
             FROM posts p \
             ORDER BY p.published_at DESC, p.slug ASC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_for_tag(
        &self,
        tag_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            "SELECT p.id, p.slug, p.title, p.body, p.image_url, p.published_at, p.author_id, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count \
             FROM posts p \
             INNER JOIN post_tags pt ON pt.post_id = p.id \
             WHERE pt.tag_id = $1 \
             ORDER BY p.published_at DESC, p.slug ASC \
             LIMIT $2",
        )
        .bind(tag_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        // LIMIT 2 so a lost uniqueness constraint is detected instead of
        // silently picking a row.
        let mut rows: Vec<PostRow> = sqlx::query_as(
            "SELECT p.id, p.slug, p.title, p.body, p.image_url, p.published_at, p.author_id, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count \
             FROM posts p \
             WHERE p.slug = $1 \
             LIMIT 2",
        )
        .bind(slug)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if rows.len() > 1 {
            return Err(RepoError::integrity(format!(
                "slug `{slug}` matches more than one post"
            )));
        }

        Ok(rows.pop().map(PostRecord::from))
    }
}
