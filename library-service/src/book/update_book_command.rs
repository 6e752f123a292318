use std::collections::BTreeSet;

use bomboni_request::error::{CommonError, RequestError};
use library_api::model::{author::AuthorId, book::BookId};
use tracing::info;

use super::{
    add_book_command::check_written,
    repository::{BookRecordReplace, BookRepositoryArc},
};
use crate::{error::AppResult, validation::required_name};

/// Command for replacing a book's title and author set.
#[derive(Debug, Clone)]
pub struct UpdateBookCommand {
    book_repository: BookRepositoryArc,
}

#[derive(Debug)]
pub struct UpdateBookCommandInput<'a> {
    pub id: BookId,
    pub name: &'a str,
    pub author_ids: &'a BTreeSet<AuthorId>,
}

impl UpdateBookCommand {
    pub fn new(book_repository: BookRepositoryArc) -> Self {
        Self { book_repository }
    }

    /// # Errors
    ///
    /// Returns an error if the input is invalid, the book or an author does
    /// not exist or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, input: UpdateBookCommandInput<'_>) -> AppResult<()> {
        required_name("name", input.name)?;
        if input.author_ids.is_empty() {
            return Err(RequestError::field("author_ids", CommonError::RequiredFieldMissing).into());
        }

        let result = self
            .book_repository
            .replace_authors(BookRecordReplace {
                id: input.id,
                name: input.name,
                author_ids: input.author_ids,
            })
            .await?;
        check_written(result)?;

        info!(book_id = %input.id, "Updated book");

        Ok(())
    }
}
