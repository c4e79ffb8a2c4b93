use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::auth::AuthError;
use thiserror::Error;
use tracing::{error, warn};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials. Please check your email and password.";
pub const MALFORMED_BODY_MESSAGE: &str = "Request body is missing or malformed. Please check your JSON format.";
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected internal server error occurred. Please try again later.";

/// Every failure a handler or middleware can return.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// Rejection kind only; serde detail can echo request values.
    MalformedBody(&'static str),
    Unauthorized(&'static str),
    MethodNotAllowed { method: String, allowed: &'static str },
    NotFound,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let kind = match rejection {
            JsonRejection::JsonDataError(_) => "json_data",
            JsonRejection::JsonSyntaxError(_) => "json_syntax",
            JsonRejection::MissingJsonContentType(_) => "missing_content_type",
            JsonRejection::BytesRejection(_) => "body_read",
            _ => "other",
        };
        ApiError::MalformedBody(kind)
    }
}

fn error_json(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(msg))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(AuthError::InvalidInput(fields)) => {
                warn!(fields = %fields, "request validation failed");
                (StatusCode::BAD_REQUEST, Json(fields)).into_response()
            }
            ApiError::Auth(e @ AuthError::IdentityAlreadyExists(_)) => {
                warn!(code = e.code(), "business conflict");
                error_json(StatusCode::CONFLICT, e.to_string())
            }
            ApiError::Auth(AuthError::InvalidCredentials) => {
                warn!("authentication failed");
                error_json(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE)
            }
            ApiError::Auth(e @ (AuthError::StorageFailure(_) | AuthError::Internal(_))) => {
                error!(code = e.code(), error = %e, "request failed");
                error_json(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
            ApiError::MalformedBody(kind) => {
                warn!(kind, "http message not readable");
                error_json(StatusCode::BAD_REQUEST, MALFORMED_BODY_MESSAGE)
            }
            ApiError::Unauthorized(reason) => error_json(StatusCode::UNAUTHORIZED, reason),
            ApiError::MethodNotAllowed { method, allowed } => {
                warn!(%method, allowed, "method not allowed");
                let msg = format!(
                    "Request method '{method}' is not supported for this endpoint. Supported methods are: {allowed}"
                );
                let mut resp = error_json(StatusCode::METHOD_NOT_ALLOWED, msg);
                resp.headers_mut().insert(header::ALLOW, HeaderValue::from_static(allowed));
                resp
            }
            ApiError::NotFound => error_json(StatusCode::NOT_FOUND, "not found"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("credential store unavailable: {0}")]
    Storage(String),
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
