use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use library_api::model::author::{AuthorId, AuthorModel};

use crate::error::AppResult;

/// In-memory repository implementation.
pub mod memory;
/// `PostgreSQL` repository implementation.
pub mod postgres;

#[derive(Debug)]
pub struct AuthorRecordInsert {
    pub id: AuthorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecordOwned {
    pub id: AuthorId,
    pub name: String,
}

pub struct AuthorRecordUpdate<'a> {
    pub id: AuthorId,
    pub name: &'a str,
}

#[async_trait]
pub trait AuthorRepository: Debug {
    async fn insert(&self, record: AuthorRecordInsert) -> AppResult<()>;

    /// Returns `true` if a record was updated, `false` if not found.
    async fn update(&self, update: AuthorRecordUpdate<'_>) -> AppResult<bool>;

    async fn select(&self, id: &AuthorId) -> AppResult<Option<AuthorRecordOwned>>;

    /// Returns the subset of `ids` that exist.
    async fn select_existing(&self, ids: &BTreeSet<AuthorId>) -> AppResult<BTreeSet<AuthorId>>;
}

pub type AuthorRepositoryArc = Arc<dyn AuthorRepository + Send + Sync>;

impl From<AuthorRecordOwned> for AuthorModel {
    fn from(record: AuthorRecordOwned) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}
