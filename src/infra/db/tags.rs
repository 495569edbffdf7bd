use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{PostTag, RepoError, TagsRepo},
    domain::entities::TagRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    title: String,
    posts_count: i64,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            posts_count: row.posts_count,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    title: String,
    posts_count: i64,
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_popular(&self, limit: u32) -> Result<Vec<TagRecord>, RepoError> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.title, COUNT(pt.post_id) AS posts_count \
             FROM tags t \
             LEFT JOIN post_tags pt ON pt.tag_id = t.id \
             GROUP BY t.id, t.title \
             ORDER BY posts_count DESC, t.title ASC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTag>, RepoError> {
        // One query for the whole page of posts; each tag carries its own
        // post-count aggregate.
        let rows: Vec<PostTagRow> = sqlx::query_as(
            "SELECT pt.post_id, t.id, t.title, \
                    (SELECT COUNT(*) FROM post_tags x WHERE x.tag_id = t.id) AS posts_count \
             FROM post_tags pt \
             INNER JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = ANY($1) \
             ORDER BY pt.post_id ASC, t.title ASC",
        )
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| PostTag {
                post_id: row.post_id,
                tag: TagRecord {
                    id: row.id,
                    title: row.title,
                    posts_count: row.posts_count,
                },
            })
            .collect())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<TagRecord>, RepoError> {
        let mut rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.title, \
                    (SELECT COUNT(*) FROM post_tags pt WHERE pt.tag_id = t.id) AS posts_count \
             FROM tags t \
             WHERE t.title = $1 \
             LIMIT 2",
        )
        .bind(title)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if rows.len() > 1 {
            return Err(RepoError::integrity(format!(
                "tag title `{title}` matches more than one tag"
            )));
        }

        Ok(rows.pop().map(TagRecord::from))
    }
}
