use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{AuthorsRepo, RepoError},
    domain::entities::AuthorRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: Uuid,
    username: String,
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>, RepoError> {
        let rows: Vec<AuthorRow> = sqlx::query_as(
            "SELECT u.id, u.username \
             FROM users u \
             WHERE u.id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| AuthorRecord {
                id: row.id,
                username: row.username,
            })
            .collect())
    }
}
