use std::collections::BTreeSet;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use library_api::model::author::AuthorId;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    author::repository::{
        AuthorRecordInsert, AuthorRecordOwned, AuthorRecordUpdate, AuthorRepository,
    },
    error::AppResult,
};

/// `PostgreSQL` implementation of the author repository.
#[derive(Debug, Clone)]
pub struct PostgresAuthorRepository {
    pool: Pool,
}

impl PostgresAuthorRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorRepository for PostgresAuthorRepository {
    async fn insert(&self, record: AuthorRecordInsert) -> AppResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO author (id, name) VALUES ($1, $2)",
                &[&record.id.0, &record.name],
            )
            .await?;
        Ok(())
    }

    async fn update(&self, update: AuthorRecordUpdate<'_>) -> AppResult<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE author SET name = $2, updated_at = now() WHERE id = $1",
                &[&update.id.0, &update.name],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn select(&self, id: &AuthorId) -> AppResult<Option<AuthorRecordOwned>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, name FROM author WHERE id = $1", &[&id.0])
            .await?;
        Ok(row.as_ref().map(author_from_row))
    }

    async fn select_existing(&self, ids: &BTreeSet<AuthorId>) -> AppResult<BTreeSet<AuthorId>> {
        let client = self.pool.get().await?;
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let rows = client
            .query("SELECT id FROM author WHERE id = ANY($1)", &[&ids])
            .await?;
        Ok(rows.iter().map(|row| AuthorId(row.get(0))).collect())
    }
}

fn author_from_row(row: &Row) -> AuthorRecordOwned {
    AuthorRecordOwned {
        id: AuthorId(row.get("id")),
        name: row.get("name"),
    }
}
