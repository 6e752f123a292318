use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use bomboni_request::error::RequestError;
use uuid::Uuid;

use crate::{model::author::AuthorId, v1::Book};

/// A book together with the full set of its authors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookModel {
    pub id: BookId,
    pub name: String,
    pub author_ids: BTreeSet<AuthorId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookId(pub Uuid);

impl BookId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Creates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BookId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        book_id_convert::parse(s)
    }
}

impl From<BookModel> for Book {
    fn from(book: BookModel) -> Self {
        Self {
            id: book.id.to_string(),
            name: book.name,
            author_id: book
                .author_ids
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

pub mod book_id_convert {
    use bomboni_request::error::{CommonError, RequestResult};
    use uuid::Uuid;

    use crate::model::book::BookId;

    /// Parse a book ID from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a UUID.
    pub fn parse<S: AsRef<str> + ToString>(value: S) -> RequestResult<BookId> {
        Uuid::parse_str(value.as_ref())
            .map(BookId)
            .map_err(|_| CommonError::InvalidId.into())
    }

    pub fn write(id: BookId) -> String {
        id.to_string()
    }
}
