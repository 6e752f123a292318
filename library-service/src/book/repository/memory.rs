use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
    sync::Arc,
};

use async_trait::async_trait;
use library_api::model::{author::AuthorId, book::BookId};
use tokio::sync::RwLock;

use crate::{
    author::repository::AuthorRepositoryArc,
    book::repository::{
        BookRecordInsert, BookRecordOwned, BookRecordReplace, BookRepository, BookWriteResult,
    },
    error::AppResult,
};

/// In-memory implementation of the book repository.
///
/// Author existence is checked through the author repository. Authors are
/// never removed, so a positive check stays valid for the rest of the write.
#[derive(Debug)]
pub struct MemoryBookRepository {
    books: Arc<RwLock<BTreeMap<BookId, BookRecordOwned>>>,
    author_repository: AuthorRepositoryArc,
}

impl MemoryBookRepository {
    /// Creates a new empty memory book repository.
    pub fn new(author_repository: AuthorRepositoryArc) -> Self {
        Self {
            books: Arc::new(RwLock::new(BTreeMap::new())),
            author_repository,
        }
    }

    async fn missing_authors(
        &self,
        author_ids: &BTreeSet<AuthorId>,
    ) -> AppResult<Option<BookWriteResult>> {
        let existing = self.author_repository.select_existing(author_ids).await?;
        if existing.len() == author_ids.len() {
            return Ok(None);
        }
        Ok(Some(BookWriteResult::MissingAuthors(
            author_ids.difference(&existing).copied().collect(),
        )))
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn insert_with_authors(&self, record: BookRecordInsert) -> AppResult<BookWriteResult> {
        if let Some(missing) = self.missing_authors(&record.author_ids).await? {
            return Ok(missing);
        }

        self.books.write().await.insert(
            record.id,
            BookRecordOwned {
                id: record.id,
                name: record.name,
                author_ids: record.author_ids,
            },
        );
        Ok(BookWriteResult::Written)
    }

    async fn select_with_authors(&self, id: &BookId) -> AppResult<Option<BookRecordOwned>> {
        let books = self.books.read().await;
        Ok(books.get(id).cloned())
    }

    async fn replace_authors(&self, replace: BookRecordReplace<'_>) -> AppResult<BookWriteResult> {
        if !self.books.read().await.contains_key(&replace.id) {
            return Ok(BookWriteResult::MissingBook);
        }
        if let Some(missing) = self.missing_authors(replace.author_ids).await? {
            return Ok(missing);
        }

        let mut books = self.books.write().await;
        let Some(book) = books.get_mut(&replace.id) else {
            return Ok(BookWriteResult::MissingBook);
        };
        book.name = replace.name.to_string();
        book.author_ids.clone_from(replace.author_ids);
        Ok(BookWriteResult::Written)
    }

    async fn select_by_author(
        &self,
        author_id: &AuthorId,
        after: Option<BookId>,
        limit: usize,
    ) -> AppResult<Vec<BookRecordOwned>> {
        let books = self.books.read().await;
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(books
            .range((lower, Bound::Unbounded))
            .map(|(_, book)| book)
            .filter(|book| book.author_ids.contains(author_id))
            .take(limit)
            .cloned()
            .collect())
    }
}
