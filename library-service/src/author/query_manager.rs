use library_api::model::{
    author::{AuthorId, AuthorModel},
    error::LibraryError,
};

use crate::{author::repository::AuthorRepositoryArc, error::AppResult};

#[derive(Debug, Clone)]
pub struct AuthorQueryManager {
    author_repository: AuthorRepositoryArc,
}

impl AuthorQueryManager {
    pub fn new(author_repository: AuthorRepositoryArc) -> Self {
        Self { author_repository }
    }

    /// # Errors
    ///
    /// Returns an error if the author does not exist or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn query_single(&self, id: AuthorId) -> AppResult<AuthorModel> {
        let record = self
            .author_repository
            .select(&id)
            .await?
            .ok_or(LibraryError::AuthorNotFound)?;

        Ok(record.into())
    }
}
