use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use library_api::model::author::AuthorId;
use tokio::sync::RwLock;

use crate::{
    author::repository::{
        AuthorRecordInsert, AuthorRecordOwned, AuthorRecordUpdate, AuthorRepository,
    },
    error::AppResult,
};

/// In-memory implementation of the author repository.
#[derive(Debug)]
pub struct MemoryAuthorRepository {
    authors: Arc<RwLock<HashMap<AuthorId, AuthorRecordOwned>>>,
}

impl Default for MemoryAuthorRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthorRepository {
    /// Creates a new empty memory repository.
    pub fn new() -> Self {
        Self {
            authors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a new memory repository with initial data.
    pub fn with_data(authors: Vec<AuthorRecordOwned>) -> Self {
        Self {
            authors: Arc::new(RwLock::new(
                authors
                    .into_iter()
                    .map(|author| (author.id, author))
                    .collect(),
            )),
        }
    }
}

#[async_trait]
impl AuthorRepository for MemoryAuthorRepository {
    async fn insert(&self, record: AuthorRecordInsert) -> AppResult<()> {
        self.authors.write().await.insert(
            record.id,
            AuthorRecordOwned {
                id: record.id,
                name: record.name,
            },
        );
        Ok(())
    }

    async fn update(&self, update: AuthorRecordUpdate<'_>) -> AppResult<bool> {
        let mut authors = self.authors.write().await;
        if let Some(author) = authors.get_mut(&update.id) {
            author.name = update.name.to_string();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn select(&self, id: &AuthorId) -> AppResult<Option<AuthorRecordOwned>> {
        let authors = self.authors.read().await;
        Ok(authors.get(id).cloned())
    }

    async fn select_existing(&self, ids: &BTreeSet<AuthorId>) -> AppResult<BTreeSet<AuthorId>> {
        let authors = self.authors.read().await;
        Ok(ids
            .iter()
            .filter(|id| authors.contains_key(id))
            .copied()
            .collect())
    }
}
