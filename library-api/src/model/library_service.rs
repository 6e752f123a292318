//! Parsed forms of the `Library` service requests.
//!
//! Parsing checks identifier syntax and that names are present. Whitespace
//! rules and author set checks belong to the commands.

use bomboni_request::derive::Parse;

use crate::{
    model::{
        author::{AuthorId, author_id_convert},
        book::{BookId, book_id_convert},
    },
    v1::{
        AddBookRequest, ChangeAuthorInfoRequest, GetAuthorBooksRequest, GetAuthorInfoRequest,
        GetBookInfoRequest, RegisterAuthorRequest, UpdateBookRequest,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = RegisterAuthorRequest, request, write)]
pub struct ParsedRegisterAuthorRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = GetAuthorInfoRequest, request, write)]
pub struct ParsedGetAuthorInfoRequest {
    #[parse(convert = author_id_convert)]
    pub id: AuthorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = ChangeAuthorInfoRequest, request, write)]
pub struct ParsedChangeAuthorInfoRequest {
    #[parse(convert = author_id_convert)]
    pub id: AuthorId,
    pub name: String,
}

/// Author ids keep request order and may repeat; commands collapse them.
#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = AddBookRequest, request, write)]
pub struct ParsedAddBookRequest {
    pub name: String,
    #[parse(source = "author_id", convert = author_id_convert)]
    pub author_ids: Vec<AuthorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = UpdateBookRequest, request, write)]
pub struct ParsedUpdateBookRequest {
    #[parse(convert = book_id_convert)]
    pub id: BookId,
    pub name: String,
    #[parse(convert = author_id_convert)]
    pub author_ids: Vec<AuthorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = GetBookInfoRequest, request, write)]
pub struct ParsedGetBookInfoRequest {
    #[parse(convert = book_id_convert)]
    pub id: BookId,
}

#[derive(Debug, Clone, PartialEq, Eq, Parse)]
#[parse(source = GetAuthorBooksRequest, request, write)]
pub struct ParsedGetAuthorBooksRequest {
    #[parse(convert = author_id_convert)]
    pub author_id: AuthorId,
}
