use thiserror::Error;
use tonic::Status;

/// Catalog errors that are not about the shape of a request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryError {
    #[error("author not found")]
    AuthorNotFound,
    #[error("book not found")]
    BookNotFound,
}

impl From<LibraryError> for Status {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::AuthorNotFound | LibraryError::BookNotFound => {
                Self::not_found(err.to_string())
            }
        }
    }
}
