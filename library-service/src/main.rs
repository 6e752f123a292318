//! Library gRPC Service
//!
//! Serves the `library.v1.Library` gRPC service and its HTTP/JSON gateway.
//!
//! ## Features
//!
//! - Author and book management
//! - Streaming of an author's books
//! - Schema migrations on startup
//! - gRPC reflection support
//! - Structured logging and tracing

use std::process::ExitCode;

use library_service::{
    app::App, config::AppConfig, error::AppResult, tracing::tracer::Tracer,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let tracer = match Tracer::install(&config) {
        Ok(tracer) => tracer,
        Err(err) => {
            eprintln!("failed to install tracing: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Starting {} v{}",
        config.distribution.name,
        config.distribution.version.as_deref().unwrap_or("unknown"),
    );

    let code = match start(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Service failed");
            ExitCode::FAILURE
        }
    };

    tracer.shutdown();
    code
}

async fn start(config: AppConfig) -> AppResult<()> {
    let app = App::bootstrap(config).await?;
    app.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
