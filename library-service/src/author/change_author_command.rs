use library_api::model::{author::AuthorId, error::LibraryError};
use tracing::info;

use crate::{
    author::repository::{AuthorRecordUpdate, AuthorRepositoryArc},
    error::AppResult,
    validation::required_name,
};

/// Command for renaming an existing author.
#[derive(Debug, Clone)]
pub struct ChangeAuthorCommand {
    author_repository: AuthorRepositoryArc,
}

#[derive(Debug, Clone)]
pub struct ChangeAuthorCommandInput<'a> {
    pub id: AuthorId,
    pub name: &'a str,
}

impl ChangeAuthorCommand {
    pub fn new(author_repository: AuthorRepositoryArc) -> Self {
        Self { author_repository }
    }

    /// Applying the same input twice leaves the same state as applying it once.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the author does not exist or the
    /// store fails.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, input: ChangeAuthorCommandInput<'_>) -> AppResult<()> {
        required_name("name", input.name)?;

        let updated = self
            .author_repository
            .update(AuthorRecordUpdate {
                id: input.id,
                name: input.name,
            })
            .await?;
        if !updated {
            return Err(LibraryError::AuthorNotFound.into());
        }

        info!(author_id = %input.id, "Changed author");

        Ok(())
    }
}
