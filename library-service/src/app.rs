use std::{future::Future, sync::Arc};

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use library_api::v1::{FILE_DESCRIPTOR_SET, library_server::LibraryServer};
use tokio::{net::TcpListener, sync::watch};
use tokio_postgres::NoTls;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use crate::{
    adapter::LibraryAdapter,
    author::{
        change_author_command::ChangeAuthorCommand,
        query_manager::AuthorQueryManager,
        register_author_command::RegisterAuthorCommand,
        repository::{
            AuthorRepositoryArc, memory::MemoryAuthorRepository,
            postgres::PostgresAuthorRepository,
        },
    },
    book::{
        add_book_command::AddBookCommand,
        query_manager::{BookQueryManager, DEFAULT_PAGE_SIZE},
        repository::{
            BookRepositoryArc, memory::MemoryBookRepository, postgres::PostgresBookRepository,
        },
        update_book_command::UpdateBookCommand,
    },
    config::{AppConfig, DatabaseConfig, PostgresConfig},
    error::{AppError, AppResult},
    gateway,
    migration::{Migrator, postgres::PostgresMigrationConnector},
};

/// Wires commands and queries over the given repositories.
pub fn library_adapter(
    author_repository: AuthorRepositoryArc,
    book_repository: BookRepositoryArc,
    page_size: usize,
) -> LibraryAdapter {
    LibraryAdapter::new(
        RegisterAuthorCommand::new(Arc::clone(&author_repository)),
        ChangeAuthorCommand::new(Arc::clone(&author_repository)),
        AuthorQueryManager::new(Arc::clone(&author_repository)),
        AddBookCommand::new(Arc::clone(&book_repository)),
        UpdateBookCommand::new(Arc::clone(&book_repository)),
        BookQueryManager::new(book_repository, author_repository).with_page_size(page_size),
    )
}

/// A bootstrapped service, ready to accept connections.
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    adapter: LibraryAdapter,
    pool: Option<Pool>,
}

impl App {
    /// Migrates the schema, then builds the store and the service.
    ///
    /// # Errors
    ///
    /// Returns an error if migration fails or the pool cannot be built.
    pub async fn bootstrap(config: AppConfig) -> AppResult<Self> {
        let (author_repository, book_repository, pool) = match &config.database {
            DatabaseConfig::Memory => {
                info!("Using in-memory store");
                let author_repository: AuthorRepositoryArc = Arc::new(MemoryAuthorRepository::new());
                let book_repository: BookRepositoryArc =
                    Arc::new(MemoryBookRepository::new(Arc::clone(&author_repository)));
                (author_repository, book_repository, None)
            }
            DatabaseConfig::Postgres(postgres) => {
                Migrator::new(
                    Box::new(PostgresMigrationConnector::new(postgres.connect_config())),
                    &config.migration,
                )
                .run()
                .await?;

                let pool = create_pool(postgres)?;
                info!(
                    host = %postgres.host,
                    database = %postgres.name,
                    max_connections = postgres.max_connections,
                    "Using PostgreSQL store"
                );
                let author_repository: AuthorRepositoryArc =
                    Arc::new(PostgresAuthorRepository::new(pool.clone()));
                let book_repository: BookRepositoryArc =
                    Arc::new(PostgresBookRepository::new(pool.clone()));
                (author_repository, book_repository, Some(pool))
            }
        };

        Ok(Self {
            adapter: library_adapter(author_repository, book_repository, DEFAULT_PAGE_SIZE),
            config,
            pool,
        })
    }

    pub const fn adapter(&self) -> &LibraryAdapter {
        &self.adapter
    }

    /// Serves gRPC and the gateway on the configured ports until `shutdown`
    /// resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if a port cannot be bound or a server fails.
    pub async fn serve<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let grpc_listener = TcpListener::bind(self.config.server.grpc_address()).await?;
        let gateway_listener = TcpListener::bind(self.config.server.gateway_address()).await?;
        self.serve_with_listeners(grpc_listener, gateway_listener, shutdown)
            .await
    }

    /// Serves on already bound listeners. Both servers stop accepting on
    /// `shutdown` and finish in-flight requests before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if a server fails.
    pub async fn serve_with_listeners<F>(
        self,
        grpc_listener: TcpListener,
        gateway_listener: TcpListener,
        shutdown: F,
    ) -> AppResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|err| AppError::Internal(err.into()))?;

        info!(address = %grpc_listener.local_addr()?, "gRPC server started");
        let grpc = Server::builder()
            .add_service(reflection)
            .add_service(LibraryServer::new(self.adapter.clone()))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(grpc_listener),
                stopped(shutdown_rx.clone()),
            );

        info!(address = %gateway_listener.local_addr()?, "Gateway server started");
        let gateway = axum::serve(gateway_listener, gateway::router(self.adapter.clone()))
            .with_graceful_shutdown(stopped(shutdown_rx));

        let signal = async move {
            shutdown.await;
            info!("Shutting down");
            // Receivers dropping first is fine.
            let _ = shutdown_tx.send(());
            Ok::<_, AppError>(())
        };

        tokio::try_join!(
            async { grpc.await.map_err(AppError::from) },
            async { gateway.await.map_err(AppError::from) },
            signal,
        )?;

        if let Some(pool) = self.pool {
            pool.close();
        }
        info!("Stopped");

        Ok(())
    }
}

async fn stopped(mut shutdown: watch::Receiver<()>) {
    // An error means the sender is gone, which also means stop.
    let _ = shutdown.changed().await;
}

fn create_pool(config: &PostgresConfig) -> AppResult<Pool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.recycling_method = RecyclingMethod::Fast;
    let manager = Manager::from_config(config.connect_config(), NoTls, manager_config);
    Ok(Pool::builder(manager)
        .max_size(config.max_connections.max(1))
        .build()?)
}
