use library_api::model::author::{AuthorId, AuthorModel};
use tracing::info;

use crate::{
    author::repository::{AuthorRecordInsert, AuthorRepositoryArc},
    error::AppResult,
    validation::required_name,
};

/// Command for registering new authors.
///
/// Handles the business logic for author creation including ID generation
/// and validation.
#[derive(Debug, Clone)]
pub struct RegisterAuthorCommand {
    author_repository: AuthorRepositoryArc,
}

/// Input data for registering an author.
#[derive(Debug, Clone)]
pub struct RegisterAuthorCommandInput<'a> {
    /// Author display name
    pub name: &'a str,
}

/// Output data from author registration.
#[derive(Debug, Clone)]
pub struct RegisterAuthorCommandOutput {
    /// The registered author
    pub author: AuthorModel,
}

impl RegisterAuthorCommand {
    pub fn new(author_repository: AuthorRepositoryArc) -> Self {
        Self { author_repository }
    }

    /// Executes the author registration command.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn execute(
        &self,
        input: RegisterAuthorCommandInput<'_>,
    ) -> AppResult<RegisterAuthorCommandOutput> {
        required_name("name", input.name)?;

        let id = AuthorId::generate();
        self.author_repository
            .insert(AuthorRecordInsert {
                id,
                name: input.name.to_string(),
            })
            .await?;

        info!(author_id = %id, "Registered author");

        Ok(RegisterAuthorCommandOutput {
            author: AuthorModel {
                id,
                name: input.name.to_string(),
            },
        })
    }
}
