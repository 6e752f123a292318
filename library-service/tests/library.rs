mod common;

use std::collections::{BTreeSet, HashSet};

use common::{TestServer, memory_config};
use library_api::v1::{
    AddBookRequest, ChangeAuthorInfoRequest, GetAuthorBooksRequest, GetAuthorInfoRequest,
    GetBookInfoRequest, RegisterAuthorRequest, UpdateBookRequest,
};
use tonic::Code;
use uuid::Uuid;

#[tokio::test]
async fn author_lifecycle() {
    let server = TestServer::start(memory_config()).await;
    let mut client = server.client.clone();

    let id = server.register_author("Test testovich").await;
    let author = client
        .get_author_info(GetAuthorInfoRequest { id: id.clone() })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(author.id, id);
    assert_eq!(author.name, "Test testovich");

    for _ in 0..2 {
        client
            .change_author_info(ChangeAuthorInfoRequest {
                id: id.clone(),
                name: "Test123".into(),
            })
            .await
            .unwrap();
        let author = client
            .get_author_info(GetAuthorInfoRequest { id: id.clone() })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(author.name, "Test123");
    }

    let status = client
        .register_author(RegisterAuthorRequest { name: "  ".into() })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn book_lifecycle() {
    let server = TestServer::start(memory_config()).await;
    let mut client = server.client.clone();

    let first = server.register_author("First").await;
    let second = server.register_author("Second").await;

    let book = server.add_book("Book", &[first.clone()]).await.unwrap();
    assert_eq!(book.author_id, vec![first.clone()]);

    client
        .update_book(UpdateBookRequest {
            id: book.id.clone(),
            name: "Book 2".into(),
            author_ids: vec![second.clone()],
        })
        .await
        .unwrap();

    let fetched = client
        .get_book_info(GetBookInfoRequest {
            id: book.id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .book
        .unwrap();
    assert_eq!(fetched.name, "Book 2");
    assert_eq!(fetched.author_id, vec![second.clone()]);

    assert!(server.author_books(&first).await.unwrap().is_empty());
    assert_eq!(server.author_books(&second).await.unwrap(), vec![fetched]);

    server.stop().await;
}

#[tokio::test]
async fn add_book_rejections() {
    let server = TestServer::start(memory_config()).await;
    let author = server.register_author("Author").await;

    let status = server
        .add_book("Orphan", &[author.clone(), Uuid::new_v4().to_string()])
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert!(server.author_books(&author).await.unwrap().is_empty());

    for (name, author_ids) in [("", vec![author.clone()]), ("Book", vec![])] {
        let status = server.add_book(name, &author_ids).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    let status = server
        .add_book("Book", &["123".to_string()])
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn id_status_codes() {
    let server = TestServer::start(memory_config()).await;
    let mut client = server.client.clone();
    let missing = Uuid::new_v4().to_string();

    for (id, code) in [
        ("123".to_string(), Code::InvalidArgument),
        (missing, Code::NotFound),
    ] {
        let status = client
            .get_author_info(GetAuthorInfoRequest { id: id.clone() })
            .await
            .unwrap_err();
        assert_eq!(status.code(), code);

        let status = client
            .get_book_info(GetBookInfoRequest { id: id.clone() })
            .await
            .unwrap_err();
        assert_eq!(status.code(), code);

        let status = client
            .change_author_info(ChangeAuthorInfoRequest {
                id: id.clone(),
                name: "Name".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), code);

        let status = client
            .get_author_books(GetAuthorBooksRequest { author_id: id })
            .await
            .unwrap_err();
        assert_eq!(status.code(), code);
    }

    server.stop().await;
}

#[tokio::test]
async fn co_authors() {
    let server = TestServer::start(memory_config()).await;
    let mut client = server.client.clone();

    let mut author_ids = Vec::new();
    for i in 0..10 {
        author_ids.push(server.register_author(&format!("Author {i}")).await);
    }

    let book = server.add_book("Anthology", &author_ids).await.unwrap();
    let fetched = client
        .get_book_info(GetBookInfoRequest { id: book.id })
        .await
        .unwrap()
        .into_inner()
        .book
        .unwrap();
    assert_eq!(
        fetched.author_id.into_iter().collect::<BTreeSet<_>>(),
        author_ids.into_iter().collect::<BTreeSet<_>>()
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_books_for_one_author() {
    const WORKERS: usize = 50;
    const BOOKS: usize = 1234;

    let server = TestServer::start(memory_config()).await;
    let author_id = server.register_author("Prolific").await;

    let handles = (0..WORKERS)
        .map(|worker| {
            let mut client = server.client.clone();
            let author_id = author_id.clone();
            tokio::spawn(async move {
                for i in (worker..BOOKS).step_by(WORKERS) {
                    client
                        .add_book(AddBookRequest {
                            name: format!("Book {i}"),
                            author_id: vec![author_id.clone()],
                        })
                        .await
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.await.unwrap();
    }

    let books = server.author_books(&author_id).await.unwrap();
    assert_eq!(books.len(), BOOKS);
    let names: HashSet<_> = books.into_iter().map(|book| book.name).collect();
    assert_eq!(
        names,
        (0..BOOKS)
            .map(|i| format!("Book {i}"))
            .collect::<HashSet<_>>()
    );

    server.stop().await;
}

#[tokio::test]
async fn gateway() {
    let server = TestServer::start(memory_config()).await;

    let (status, body) = server
        .http("POST", "/v1/library/author", Some(r#"{"name": "Name"}"#))
        .await;
    assert_eq!(status, 200);
    let id = serde_json::from_str::<serde_json::Value>(&body).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = server
        .http("GET", &format!("/v1/library/author/{id}"), None)
        .await;
    assert_eq!(status, 200);
    let author: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(author["id"], id.as_str());
    assert_eq!(author["name"], "Name");

    let (status, _) = server
        .http_with_content_type(
            "PUT",
            &format!("/v1/library/author/{id}"),
            Some("application/json"),
            Some(r#"{"name": "Renamed"}"#),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = server
        .http(
            "POST",
            "/v1/library/book",
            Some(&format!(r#"{{"name": "Book", "author_id": ["{id}", "{id}"]}}"#)),
        )
        .await;
    assert_eq!(status, 200);
    let book: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(book["book"]["name"], "Book");
    assert_eq!(book["book"]["author_id"], serde_json::json!([id]));

    for method in ["GET", "POST", "PUT", "DELETE"] {
        let (status, _) = server.http(method, "/v0/not_library/not_author", None).await;
        assert_eq!(status, 404);
    }

    server.stop().await;
}
