use std::{collections::BTreeSet, pin::Pin};

use bomboni_request::parse::RequestParse;
use futures::{Stream, StreamExt};
use library_api::{
    model::{
        author::AuthorId,
        library_service::{
            ParsedAddBookRequest, ParsedChangeAuthorInfoRequest, ParsedGetAuthorBooksRequest,
            ParsedGetAuthorInfoRequest, ParsedGetBookInfoRequest, ParsedRegisterAuthorRequest,
            ParsedUpdateBookRequest,
        },
    },
    v1::{
        AddBookRequest, AddBookResponse, Book, ChangeAuthorInfoRequest, ChangeAuthorInfoResponse,
        GetAuthorBooksRequest, GetAuthorInfoRequest, GetAuthorInfoResponse, GetBookInfoRequest,
        GetBookInfoResponse, RegisterAuthorRequest, RegisterAuthorResponse, UpdateBookRequest,
        UpdateBookResponse, library_server::Library,
    },
};
use tonic::{Request, Response, Status};

use crate::{
    author::{
        change_author_command::{ChangeAuthorCommand, ChangeAuthorCommandInput},
        query_manager::AuthorQueryManager,
        register_author_command::{RegisterAuthorCommand, RegisterAuthorCommandInput},
    },
    book::{
        add_book_command::{AddBookCommand, AddBookCommandInput},
        query_manager::BookQueryManager,
        update_book_command::{UpdateBookCommand, UpdateBookCommandInput},
    },
};

/// gRPC adapter of the `Library` service.
///
/// Parses protobuf requests, runs the matching command or query and maps the
/// outcome back to protobuf. The HTTP gateway calls into the same adapter.
#[derive(Debug, Clone)]
pub struct LibraryAdapter {
    register_author_command: RegisterAuthorCommand,
    change_author_command: ChangeAuthorCommand,
    author_query_manager: AuthorQueryManager,
    add_book_command: AddBookCommand,
    update_book_command: UpdateBookCommand,
    book_query_manager: BookQueryManager,
}

impl LibraryAdapter {
    pub fn new(
        register_author_command: RegisterAuthorCommand,
        change_author_command: ChangeAuthorCommand,
        author_query_manager: AuthorQueryManager,
        add_book_command: AddBookCommand,
        update_book_command: UpdateBookCommand,
        book_query_manager: BookQueryManager,
    ) -> Self {
        Self {
            register_author_command,
            change_author_command,
            author_query_manager,
            add_book_command,
            update_book_command,
            book_query_manager,
        }
    }
}

pub type BookStreamResponse = Pin<Box<dyn Stream<Item = Result<Book, Status>> + Send>>;

#[tonic::async_trait]
impl Library for LibraryAdapter {
    #[tracing::instrument(skip_all)]
    async fn register_author(
        &self,
        request: Request<RegisterAuthorRequest>,
    ) -> Result<Response<RegisterAuthorResponse>, Status> {
        let request = ParsedRegisterAuthorRequest::parse(request.into_inner())?;

        let result = self
            .register_author_command
            .execute(RegisterAuthorCommandInput {
                name: &request.name,
            })
            .await?;

        Ok(Response::new(RegisterAuthorResponse {
            id: result.author.id.to_string(),
        }))
    }

    #[tracing::instrument(skip_all)]
    async fn get_author_info(
        &self,
        request: Request<GetAuthorInfoRequest>,
    ) -> Result<Response<GetAuthorInfoResponse>, Status> {
        let request = ParsedGetAuthorInfoRequest::parse(request.into_inner())?;

        let author = self.author_query_manager.query_single(request.id).await?;

        Ok(Response::new(author.into()))
    }

    #[tracing::instrument(skip_all)]
    async fn change_author_info(
        &self,
        request: Request<ChangeAuthorInfoRequest>,
    ) -> Result<Response<ChangeAuthorInfoResponse>, Status> {
        let request = ParsedChangeAuthorInfoRequest::parse(request.into_inner())?;

        self.change_author_command
            .execute(ChangeAuthorCommandInput {
                id: request.id,
                name: &request.name,
            })
            .await?;

        Ok(Response::new(ChangeAuthorInfoResponse {}))
    }

    #[tracing::instrument(skip_all)]
    async fn add_book(
        &self,
        request: Request<AddBookRequest>,
    ) -> Result<Response<AddBookResponse>, Status> {
        let request = ParsedAddBookRequest::parse(request.into_inner())?;
        let author_ids: BTreeSet<AuthorId> = request.author_ids.into_iter().collect();

        let result = self
            .add_book_command
            .execute(AddBookCommandInput {
                name: &request.name,
                author_ids: &author_ids,
            })
            .await?;

        Ok(Response::new(AddBookResponse {
            book: Some(result.book.into()),
        }))
    }

    #[tracing::instrument(skip_all)]
    async fn update_book(
        &self,
        request: Request<UpdateBookRequest>,
    ) -> Result<Response<UpdateBookResponse>, Status> {
        let request = ParsedUpdateBookRequest::parse(request.into_inner())?;
        let author_ids: BTreeSet<AuthorId> = request.author_ids.into_iter().collect();

        self.update_book_command
            .execute(UpdateBookCommandInput {
                id: request.id,
                name: &request.name,
                author_ids: &author_ids,
            })
            .await?;

        Ok(Response::new(UpdateBookResponse {}))
    }

    #[tracing::instrument(skip_all)]
    async fn get_book_info(
        &self,
        request: Request<GetBookInfoRequest>,
    ) -> Result<Response<GetBookInfoResponse>, Status> {
        let request = ParsedGetBookInfoRequest::parse(request.into_inner())?;

        let book = self.book_query_manager.query_single(request.id).await?;

        Ok(Response::new(GetBookInfoResponse {
            book: Some(book.into()),
        }))
    }

    type GetAuthorBooksStream = BookStreamResponse;

    #[tracing::instrument(skip_all)]
    async fn get_author_books(
        &self,
        request: Request<GetAuthorBooksRequest>,
    ) -> Result<Response<Self::GetAuthorBooksStream>, Status> {
        let request = ParsedGetAuthorBooksRequest::parse(request.into_inner())?;

        let books = self
            .book_query_manager
            .query_author_books(request.author_id)
            .await?;

        // Ends after the first error.
        let books = books
            .scan(false, |failed, item| {
                let item = if *failed {
                    None
                } else {
                    *failed = item.is_err();
                    Some(item.map(Book::from).map_err(Status::from))
                };
                futures::future::ready(item)
            })
            .boxed();

        Ok(Response::new(books))
    }
}

