#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr};

use futures::TryStreamExt;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, body::Bytes, header};
use hyper_util::rt::TokioIo;
use library_api::v1::{
    AddBookRequest, Book, GetAuthorBooksRequest, RegisterAuthorRequest,
    library_client::LibraryClient,
};
use library_service::{app::App, config::AppConfig, error::AppResult};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tonic::{Status, transport::Channel};

pub struct TestServer {
    pub client: LibraryClient<Channel>,
    pub gateway_address: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<AppResult<()>>,
}

/// Configuration backed by the in-memory store, ignoring the environment.
pub fn memory_config() -> AppConfig {
    AppConfig::load_from(&HashMap::from([(
        "LIBRARY_CONFIG_PATH".to_string(),
        "/nonexistent".to_string(),
    )]))
    .unwrap()
}

impl TestServer {
    pub async fn start(config: AppConfig) -> Self {
        let app = App::bootstrap(config).await.unwrap();

        let grpc_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let grpc_address = grpc_listener.local_addr().unwrap();
        let gateway_address = gateway_listener.local_addr().unwrap();

        let (shutdown, stopped) = oneshot::channel();
        let handle = tokio::spawn(app.serve_with_listeners(
            grpc_listener,
            gateway_listener,
            async move {
                let _ = stopped.await;
            },
        ));

        let client = LibraryClient::connect(format!("http://{grpc_address}"))
            .await
            .unwrap();

        Self {
            client,
            gateway_address,
            shutdown,
            handle,
        }
    }

    pub async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }

    pub async fn register_author(&self, name: &str) -> String {
        self.client
            .clone()
            .register_author(RegisterAuthorRequest {
                name: name.to_string(),
            })
            .await
            .unwrap()
            .into_inner()
            .id
    }

    pub async fn add_book(&self, name: &str, author_ids: &[String]) -> Result<Book, Status> {
        Ok(self
            .client
            .clone()
            .add_book(AddBookRequest {
                name: name.to_string(),
                author_id: author_ids.to_vec(),
            })
            .await?
            .into_inner()
            .book
            .unwrap())
    }

    pub async fn author_books(&self, author_id: &str) -> Result<Vec<Book>, Status> {
        self.client
            .clone()
            .get_author_books(GetAuthorBooksRequest {
                author_id: author_id.to_string(),
            })
            .await?
            .into_inner()
            .try_collect()
            .await
    }

    /// Sends an HTTP/1.1 request to the gateway without a `Content-Type`
    /// header and returns the status code and body.
    pub async fn http(&self, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
        self.http_with_content_type(method, path, None, body).await
    }

    pub async fn http_with_content_type(
        &self,
        method: &str,
        path: &str,
        content_type: Option<&str>,
        body: Option<&str>,
    ) -> (u16, String) {
        let stream = TcpStream::connect(self.gateway_address).await.unwrap();
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(connection);

        let mut request = Request::builder()
            .method(Method::from_bytes(method.as_bytes()).unwrap())
            .uri(path)
            .header(header::HOST, self.gateway_address.to_string());
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let request = request
            .body(Full::new(Bytes::from(body.unwrap_or_default().to_string())))
            .unwrap();

        let response = sender.send_request(request).await.unwrap();
        let status = response.status().as_u16();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }
}
