//! HTTP/JSON gateway.
//!
//! Translates JSON requests into `Library` calls on the shared adapter and
//! renders the replies as JSON. Field names follow the protobuf definitions.
//! Unknown routes, including a wrong method on a known path, are 404.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Request as HttpRequest, State},
    http::Uri,
    routing::{get, post},
};
use futures::TryStreamExt;
use library_api::v1::{
    AddBookRequest, Book, ChangeAuthorInfoRequest, GetAuthorBooksRequest, GetAuthorInfoRequest,
    GetBookInfoRequest, RegisterAuthorRequest, UpdateBookRequest, library_server::Library,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tonic::Request;
use tower_http::trace::TraceLayer;

use crate::adapter::LibraryAdapter;

pub mod error;

use error::{GatewayError, GatewayResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorNameBody {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookBody {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        alias = "author_ids",
        alias = "authorId",
        alias = "authorIds"
    )]
    pub author_id: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdBody {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorJson {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookJson {
    pub id: String,
    pub name: String,
    pub author_id: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEnvelope {
    pub book: Option<BookJson>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyBody {}

impl From<Book> for BookJson {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            name: book.name,
            author_id: book.author_id,
        }
    }
}

/// JSON request body decoded regardless of the `Content-Type` header.
///
/// An empty body decodes as `{}`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: HttpRequest, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        Ok(Self(serde_json::from_slice(body)?))
    }
}

/// Creates the gateway router over the given adapter.
pub fn router(adapter: LibraryAdapter) -> Router {
    Router::new()
        .route("/v1/library/author", post(register_author))
        .route(
            "/v1/library/author/{id}",
            get(get_author_info).put(change_author_info),
        )
        .route("/v1/library/book", post(add_book))
        .route("/v1/library/book/{id}", get(get_book_info).put(update_book))
        .route("/v1/library/author_books/{author_id}", get(get_author_books))
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(adapter)
}

async fn not_found(uri: Uri) -> GatewayError {
    GatewayError::not_found(uri.path())
}

async fn register_author(
    State(adapter): State<LibraryAdapter>,
    JsonBody(body): JsonBody<AuthorNameBody>,
) -> GatewayResult<Json<IdBody>> {
    let response = adapter
        .register_author(Request::new(RegisterAuthorRequest { name: body.name }))
        .await?
        .into_inner();
    Ok(Json(IdBody { id: response.id }))
}

async fn get_author_info(
    State(adapter): State<LibraryAdapter>,
    Path(id): Path<String>,
) -> GatewayResult<Json<AuthorJson>> {
    let response = adapter
        .get_author_info(Request::new(GetAuthorInfoRequest { id }))
        .await?
        .into_inner();
    Ok(Json(AuthorJson {
        id: response.id,
        name: response.name,
    }))
}

async fn change_author_info(
    State(adapter): State<LibraryAdapter>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AuthorNameBody>,
) -> GatewayResult<Json<EmptyBody>> {
    adapter
        .change_author_info(Request::new(ChangeAuthorInfoRequest {
            id,
            name: body.name,
        }))
        .await?;
    Ok(Json(EmptyBody {}))
}

async fn add_book(
    State(adapter): State<LibraryAdapter>,
    JsonBody(body): JsonBody<BookBody>,
) -> GatewayResult<Json<BookEnvelope>> {
    let response = adapter
        .add_book(Request::new(AddBookRequest {
            name: body.name,
            author_id: body.author_id,
        }))
        .await?
        .into_inner();
    Ok(Json(BookEnvelope {
        book: response.book.map(Into::into),
    }))
}

async fn get_book_info(
    State(adapter): State<LibraryAdapter>,
    Path(id): Path<String>,
) -> GatewayResult<Json<BookEnvelope>> {
    let response = adapter
        .get_book_info(Request::new(GetBookInfoRequest { id }))
        .await?
        .into_inner();
    Ok(Json(BookEnvelope {
        book: response.book.map(Into::into),
    }))
}

async fn update_book(
    State(adapter): State<LibraryAdapter>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<BookBody>,
) -> GatewayResult<Json<EmptyBody>> {
    adapter
        .update_book(Request::new(UpdateBookRequest {
            id,
            name: body.name,
            author_ids: body.author_id,
        }))
        .await?;
    Ok(Json(EmptyBody {}))
}

async fn get_author_books(
    State(adapter): State<LibraryAdapter>,
    Path(author_id): Path<String>,
) -> GatewayResult<Json<Vec<BookJson>>> {
    let books: Vec<Book> = adapter
        .get_author_books(Request::new(GetAuthorBooksRequest { author_id }))
        .await?
        .into_inner()
        .try_collect()
        .await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::{error::GatewayErrorBody, *};
    use crate::{
        app::library_adapter,
        author::repository::{AuthorRepositoryArc, memory::MemoryAuthorRepository},
        book::repository::memory::MemoryBookRepository,
    };

    fn app() -> Router {
        let author_repository: AuthorRepositoryArc = Arc::new(MemoryAuthorRepository::new());
        let book_repository = Arc::new(MemoryBookRepository::new(Arc::clone(&author_repository)));
        router(library_adapter(author_repository, book_repository, 100))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn read<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn author_round_trip() {
        let app = app();

        let response = send(
            &app,
            Method::POST,
            "/v1/library/author",
            Some(json!({ "name": "Name" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let IdBody { id } = read(response).await;

        let response = send(&app, Method::GET, &format!("/v1/library/author/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let author: AuthorJson = read(response).await;
        assert_eq!(
            author,
            AuthorJson {
                id: id.clone(),
                name: "Name".into()
            }
        );

        let response = send(
            &app,
            Method::PUT,
            &format!("/v1/library/author/{id}"),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let _: EmptyBody = read(response).await;
    }

    #[tokio::test]
    async fn book_round_trip() {
        let app = app();
        let IdBody { id: author_id } = read(
            send(
                &app,
                Method::POST,
                "/v1/library/author",
                Some(json!({ "name": "Author" })),
            )
            .await,
        )
        .await;

        let response = send(
            &app,
            Method::POST,
            "/v1/library/book",
            Some(json!({ "name": "Book", "author_ids": [author_id] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let BookEnvelope { book } = read(response).await;
        let book = book.unwrap();
        assert_eq!(book.author_id, vec![author_id.clone()]);

        let response = send(
            &app,
            Method::PUT,
            &format!("/v1/library/book/{}", book.id),
            Some(json!({ "name": "Book 2", "authorIds": [author_id] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            Method::GET,
            &format!("/v1/library/author_books/{author_id}"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let books: Vec<BookJson> = read(response).await;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Book 2");
    }

    #[tokio::test]
    async fn error_statuses() {
        let app = app();

        let response = send(&app, Method::GET, "/v1/library/author/123", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: GatewayErrorBody = read(response).await;
        assert_eq!(body.code, tonic::Code::InvalidArgument as i32);

        let response = send(
            &app,
            Method::GET,
            &format!("/v1/library/book/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: GatewayErrorBody = read(response).await;
        assert_eq!(body.code, tonic::Code::NotFound as i32);

        let response = send(
            &app,
            Method::POST,
            "/v1/library/book",
            Some(json!({ "name": "Book", "author_id": [Uuid::new_v4().to_string()] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            Method::POST,
            "/v1/library/author",
            Some(json!({ "name": "  " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_without_content_type() {
        let app = app();

        for content_type in [None, Some("text/plain"), Some("application/json")] {
            let response = send_raw(
                &app,
                Method::POST,
                "/v1/library/author",
                content_type,
                r#"{"name": "Plain"}"#,
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            let IdBody { id } = read(response).await;

            let response = send_raw(
                &app,
                Method::PUT,
                &format!("/v1/library/author/{id}"),
                content_type,
                r#"{"name": " Spaced "}"#,
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);

            let response = send(&app, Method::GET, &format!("/v1/library/author/{id}"), None).await;
            let author: AuthorJson = read(response).await;
            assert_eq!(author.name, " Spaced ");
        }

        let response = send_raw(&app, Method::POST, "/v1/library/author", None, "{").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: GatewayErrorBody = read(response).await;
        assert_eq!(body.code, tonic::Code::InvalidArgument as i32);

        // Empty body decodes as an empty message.
        let response = send_raw(&app, Method::POST, "/v1/library/author", None, "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: GatewayErrorBody = read(response).await;
        assert_eq!(body.code, tonic::Code::InvalidArgument as i32);
    }

    #[tokio::test]
    async fn unknown_routes() {
        let app = app();
        for method in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ] {
            let response = send(&app, method, "/v0/not_library/not_author", None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let body: GatewayErrorBody = read(response).await;
            assert_eq!(body.code, tonic::Code::NotFound as i32);
        }

        // Known path, wrong method.
        for method in [Method::DELETE, Method::PATCH] {
            let response = send(&app, method, "/v1/library/author", None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}
