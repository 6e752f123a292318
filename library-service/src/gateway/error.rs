use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tonic::{Code, Status};

/// Error body in the grpc-gateway shape, carrying the numeric gRPC code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    pub code: i32,
    pub message: String,
}

/// Gateway error: a gRPC status rendered as an HTTP response.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GatewayError(pub Status);

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn not_found(path: &str) -> Self {
        Self(Status::not_found(format!("not found: {path}")))
    }

    pub fn status_code(&self) -> StatusCode {
        http_status(self.0.code())
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl From<BytesRejection> for GatewayError {
    fn from(rejection: BytesRejection) -> Self {
        Self(Status::invalid_argument(rejection.body_text()))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self(Status::invalid_argument(err.to_string()))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = GatewayErrorBody {
            code: self.0.code() as i32,
            message: self.0.message().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// HTTP status for a gRPC code, following the grpc-gateway table.
pub const fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            StatusCode::BAD_REQUEST
        }
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(http_status(Code::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(http_status(Code::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(http_status(Code::Internal), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            GatewayError::not_found("/v0/nothing").status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
