//! Error types for the HTTP layer.
//!
//! Every failure reaching a handler is classified by [`ErrorKind`] and sent
//! back as `{ "code": "...", "message": "..." }`:
//!
//! ```text
//! NotFound      → 404        Conflict      → 409
//! InvalidState  → 409        Unauthorized  → 401
//! BadRequest    → 400        Forbidden     → 403
//! Internal      → 500  (message replaced, details only in the log)
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookstore_core::{CoreError, ErrorKind, ValidationError};
use bookstore_db::DbError;
use serde::Serialize;
use tracing::{error, warn};

/// API errors.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind(), err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self.kind {
            ErrorKind::Internal => {
                error!(error = %self.message, "Internal error");
                "Internal server error".to_string()
            }
            kind => {
                warn!(code = ?kind, message = %self.message, "Request refused");
                self.message
            }
        };

        let body = ErrorBody {
            code: self.kind,
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorKind::NotFound, StatusCode::NOT_FOUND),
            (ErrorKind::InvalidState, StatusCode::CONFLICT),
            (ErrorKind::BadRequest, StatusCode::BAD_REQUEST),
            (ErrorKind::Conflict, StatusCode::CONFLICT),
            (ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED),
            (ErrorKind::Forbidden, StatusCode::FORBIDDEN),
            (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (kind, status) in cases {
            assert_eq!(ApiError::new(kind, "x").status(), status);
        }
    }

    #[test]
    fn test_domain_errors_keep_their_kind() {
        let err: ApiError = CoreError::BookNotFound("9780000000001".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("9780000000001"));

        let err: ApiError = DbError::from(CoreError::InvalidCredentials).into();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let response = ApiError::internal("disk on fire").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
