//! HTTP error responses
//!
//! Every failure leaves the API as `{"status": ..., "message": ...}` where
//! status is `fail` for client errors and `error` for server errors.
//! Internal details are logged and withheld from the body; the
//! development-only [`expose_error_detail`] middleware adds them back.

use crate::auth::TokenError;
use crate::error::InsightError;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "Something went wrong";

/// Error returned by request handlers
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests {
        message: &'static str,
        retry_after: Duration,
    },
    Internal(InsightError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of an error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Internal error text attached to 500 responses as an extension
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, retry_after, detail) = match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m) => (m, None, None),
            ApiError::TooManyRequests {
                message,
                retry_after,
            } => (message.to_string(), Some(retry_after), None),
            ApiError::Internal(err) => {
                error!("Internal error: {}", err);
                (INTERNAL_MESSAGE.to_string(), None, Some(err.to_string()))
            }
        };

        let body = ErrorBody {
            status: if status.is_server_error() { "error" } else { "fail" },
            message,
            detail: None,
        };

        let mut response = (status, Json(body)).into_response();

        if let Some(retry_after) = retry_after {
            // Round up so clients never retry early
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        if let Some(detail) = detail {
            response.extensions_mut().insert(InternalErrorDetail(detail));
        }

        response
    }
}

impl From<InsightError> for ApiError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::Validation(m) => ApiError::BadRequest(m),
            InsightError::NotFound(m) => ApiError::NotFound(m),
            InsightError::AlreadyExists(_) => {
                ApiError::Conflict("An account with this email already exists".to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                ApiError::unauthorized("Your token has expired! Please log in again.")
            }
            TokenError::Malformed(_) | TokenError::InvalidSignature => {
                ApiError::unauthorized("Invalid token. Please log in again!")
            }
            TokenError::Key(m) => ApiError::Internal(InsightError::Other(m)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected JSON body: {}", rejection.body_text());
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// Development middleware: put internal error text back into 500 bodies
pub async fn expose_error_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    match response.extensions().get::<InternalErrorDetail>() {
        Some(InternalErrorDetail(detail)) => {
            let body = ErrorBody {
                status: "error",
                message: INTERNAL_MESSAGE.to_string(),
                detail: Some(detail.clone()),
            };
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}

/// Fallback for unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
