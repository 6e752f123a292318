use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use library_api::model::{
    author::AuthorId,
    book::{BookId, BookModel},
};

use crate::error::AppResult;

/// In-memory repository implementation.
pub mod memory;
/// `PostgreSQL` repository implementation.
pub mod postgres;

/// Book record for insertion operations.
///
/// Inserted together with one association row per author.
#[derive(Debug)]
pub struct BookRecordInsert {
    /// Unique identifier for the book
    pub id: BookId,
    /// Title of the book
    pub name: String,
    /// Authors of the book, never empty
    pub author_ids: BTreeSet<AuthorId>,
}

/// Complete book record with its author set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecordOwned {
    /// Unique identifier for the book
    pub id: BookId,
    /// Title of the book
    pub name: String,
    /// Authors of the book
    pub author_ids: BTreeSet<AuthorId>,
}

/// Full replacement of a book's title and author set.
#[derive(Debug)]
pub struct BookRecordReplace<'a> {
    /// Book to update
    pub id: BookId,
    /// New title
    pub name: &'a str,
    /// New author set, replacing the old one
    pub author_ids: &'a BTreeSet<AuthorId>,
}

/// Outcome of a transactional book write.
///
/// Anything other than [`BookWriteResult::Written`] means the transaction was
/// rolled back and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookWriteResult {
    Written,
    MissingBook,
    MissingAuthors(BTreeSet<AuthorId>),
}

/// Repository trait for book data operations.
///
/// Every write is atomic: the book row and its association rows change
/// together or not at all.
#[async_trait]
pub trait BookRepository: Debug {
    /// Inserts a book and its associations after checking that every
    /// referenced author exists, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn insert_with_authors(&self, record: BookRecordInsert) -> AppResult<BookWriteResult>;

    /// Selects a book and its author set.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn select_with_authors(&self, id: &BookId) -> AppResult<Option<BookRecordOwned>>;

    /// Updates the title and replaces the author set in one transaction.
    /// Stale associations are removed and new ones added.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn replace_authors(&self, replace: BookRecordReplace<'_>) -> AppResult<BookWriteResult>;

    /// Selects up to `limit` books of an author ordered by book id,
    /// starting after `after` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    async fn select_by_author(
        &self,
        author_id: &AuthorId,
        after: Option<BookId>,
        limit: usize,
    ) -> AppResult<Vec<BookRecordOwned>>;
}

/// Thread-safe shared reference to a book repository.
pub type BookRepositoryArc = Arc<dyn BookRepository + Send + Sync>;

impl From<BookRecordOwned> for BookModel {
    fn from(record: BookRecordOwned) -> Self {
        Self {
            id: record.id,
            name: record.name,
            author_ids: record.author_ids,
        }
    }
}
