use std::collections::BTreeSet;

use bomboni_request::error::{CommonError, RequestError};
use library_api::model::{
    author::AuthorId,
    book::{BookId, BookModel},
    error::LibraryError,
};
use tracing::{info, warn};

use crate::{
    book::repository::{BookRecordInsert, BookRepositoryArc, BookWriteResult},
    error::AppResult,
    validation::required_name,
};

/// Command for adding a book attributed to existing authors.
///
/// The author check and the inserts run in one store transaction, so a book
/// referencing an unknown author leaves no rows behind. Books of the same
/// author are independent inserts; nothing here serializes them.
#[derive(Debug, Clone)]
pub struct AddBookCommand {
    book_repository: BookRepositoryArc,
}

#[derive(Debug)]
pub struct AddBookCommandInput<'a> {
    pub name: &'a str,
    pub author_ids: &'a BTreeSet<AuthorId>,
}

#[derive(Debug)]
pub struct AddBookCommandOutput {
    pub book: BookModel,
}

impl AddBookCommand {
    pub fn new(book_repository: BookRepositoryArc) -> Self {
        Self { book_repository }
    }

    /// # Errors
    ///
    /// Returns an error if the input is invalid, an author does not exist or
    /// the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, input: AddBookCommandInput<'_>) -> AppResult<AddBookCommandOutput> {
        required_name("name", input.name)?;
        if input.author_ids.is_empty() {
            return Err(RequestError::field("author_ids", CommonError::RequiredFieldMissing).into());
        }

        let id = BookId::generate();
        let result = self
            .book_repository
            .insert_with_authors(BookRecordInsert {
                id,
                name: input.name.to_string(),
                author_ids: input.author_ids.clone(),
            })
            .await?;
        check_written(result)?;

        info!(book_id = %id, "Added book");

        Ok(AddBookCommandOutput {
            book: BookModel {
                id,
                name: input.name.to_string(),
                author_ids: input.author_ids.clone(),
            },
        })
    }
}

/// Maps a rolled back write to its not found error.
pub(crate) fn check_written(result: BookWriteResult) -> AppResult<()> {
    match result {
        BookWriteResult::Written => Ok(()),
        BookWriteResult::MissingBook => Err(LibraryError::BookNotFound.into()),
        BookWriteResult::MissingAuthors(missing) => {
            warn!(missing = ?missing, "Book references unknown authors");
            Err(LibraryError::AuthorNotFound.into())
        }
    }
}
