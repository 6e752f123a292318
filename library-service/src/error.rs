use bomboni_request::error::{CommonError, RequestError};
use library_api::model::error::LibraryError;
use thiserror::Error;
use tonic::{Code, Status, transport};
use tracing::error;

/// Application error types.
///
/// Represents all possible errors that can occur in the library service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Internal application error.
    ///
    /// Store, transport and configuration failures. Never shown to clients.
    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// Request processing error.
    ///
    /// Malformed or missing request fields.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// A referenced author or book does not exist.
    #[error("library error: {0}")]
    Library(#[from] LibraryError),
}

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wraps an arbitrary message as an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::Internal(message.into())
    }
}

macro_rules! impl_internal_errors {
    ( $( $type:ty ),* $(,)? ) => {
        $(
        impl From<$type> for AppError {
            fn from(err: $type) -> Self {
                AppError::Internal(Box::new(err))
            }
        }
        )*
    };
}
impl_internal_errors!(
    config::ConfigError,
    transport::Error,
    tokio_postgres::Error,
    deadpool_postgres::PoolError,
    deadpool_postgres::BuildError,
    std::io::Error,
    crate::migration::MigrationError,
);

macro_rules! impl_request_errors {
    ( $( $type:ty ),* $(,)? ) => {
        $(
        impl From<$type> for AppError {
            fn from(err: $type) -> Self {
                RequestError::from(err).into()
            }
        }
        )*
    };
}
impl_request_errors!(CommonError);

impl From<AppError> for Status {
    /// Converts application errors to gRPC status codes.
    ///
    /// Internal errors are logged and replaced by an opaque message.
    fn from(err: AppError) -> Self {
        match err {
            AppError::Request(err) => err.into(),
            AppError::Library(err) => err.into(),
            AppError::Internal(_) => {
                error!("internal service error: {}", err);
                Self::internal(Code::Internal.description())
            }
        }
    }
}
