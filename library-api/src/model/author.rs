use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use bomboni_request::error::RequestError;
use uuid::Uuid;

use crate::v1::GetAuthorInfoResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorModel {
    pub id: AuthorId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthorId(pub Uuid);

impl AuthorId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Creates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for AuthorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AuthorId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        author_id_convert::parse(s)
    }
}

impl From<AuthorModel> for GetAuthorInfoResponse {
    fn from(author: AuthorModel) -> Self {
        Self {
            id: author.id.to_string(),
            name: author.name,
        }
    }
}

pub mod author_id_convert {
    use bomboni_request::error::{CommonError, RequestResult};
    use uuid::Uuid;

    use crate::model::author::AuthorId;

    /// Parse an author ID from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a UUID.
    pub fn parse<S: AsRef<str> + ToString>(value: S) -> RequestResult<AuthorId> {
        Uuid::parse_str(value.as_ref())
            .map(AuthorId)
            .map_err(|_| CommonError::InvalidId.into())
    }

    pub fn write(id: AuthorId) -> String {
        id.to_string()
    }
}
