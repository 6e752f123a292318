use std::sync::Arc;

use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use library_api::model::{
    author::AuthorId,
    book::{BookId, BookModel},
    error::LibraryError,
};

use crate::{
    author::repository::AuthorRepositoryArc,
    book::repository::{BookRecordOwned, BookRepositoryArc},
    error::{AppError, AppResult},
};

/// Lazy sequence of books, fetched from the store one page at a time.
pub type BookStream = BoxStream<'static, AppResult<BookModel>>;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct BookQueryManager {
    book_repository: BookRepositoryArc,
    author_repository: AuthorRepositoryArc,
    page_size: usize,
}

impl BookQueryManager {
    pub fn new(book_repository: BookRepositoryArc, author_repository: AuthorRepositoryArc) -> Self {
        Self {
            book_repository,
            author_repository,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the book does not exist or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn query_single(&self, id: BookId) -> AppResult<BookModel> {
        let record = self
            .book_repository
            .select_with_authors(&id)
            .await?
            .ok_or(LibraryError::BookNotFound)?;

        Ok(record.into())
    }

    /// Streams every book of an author ordered by book id.
    ///
    /// Pages are requested as the stream is polled. Each page resumes after the
    /// last id seen, so an item is never repeated. Calling this again starts a
    /// fresh query.
    ///
    /// # Errors
    ///
    /// Returns an error if the author does not exist or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn query_author_books(&self, author_id: AuthorId) -> AppResult<BookStream> {
        self.author_repository
            .select(&author_id)
            .await?
            .ok_or(LibraryError::AuthorNotFound)?;

        let book_repository = Arc::clone(&self.book_repository);
        let page_size = self.page_size;

        let pages = stream::try_unfold(Some(None), move |cursor| {
            next_page(Arc::clone(&book_repository), author_id, cursor, page_size)
        });

        Ok(pages
            .map_ok(|page| {
                stream::iter(
                    page.into_iter()
                        .map(|record| Ok::<_, AppError>(BookModel::from(record))),
                )
            })
            .try_flatten()
            .boxed())
    }
}

/// Reads the page after `cursor`. The cursor is `None` once the last page has
/// been read, otherwise it holds the id to resume after.
async fn next_page(
    book_repository: BookRepositoryArc,
    author_id: AuthorId,
    cursor: Option<Option<BookId>>,
    page_size: usize,
) -> AppResult<Option<(Vec<BookRecordOwned>, Option<Option<BookId>>)>> {
    let Some(after) = cursor else {
        return Ok(None);
    };
    let page = book_repository
        .select_by_author(&author_id, after, page_size)
        .await?;
    if page.is_empty() {
        return Ok(None);
    }
    let next = if page.len() < page_size {
        None
    } else {
        page.last().map(|book| Some(book.id))
    };
    Ok(Some((page, next)))
}
