use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{domain}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth/OAuth errors
/// - E2xxx: Strava sync errors
/// - E3xxx: Webhook errors
/// - E4xxx: Metrics/analytics errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,

    // Auth/OAuth (E1xxx)
    OAuthError,
    TokenExchangeFailed,
    TokenRefreshFailed,
    AthleteMissing,
    UserNotFound,

    // Strava sync (E2xxx)
    StravaApiError,
    StravaRateLimited,
    ActivityNotFound,
    ActivityAlreadyExists,
    QueueError,

    // Webhook (E3xxx)
    SignatureMissing,
    SignatureInvalid,
    VerifyTokenMismatch,
    MalformedEvent,

    // Metrics (E4xxx)
    InvalidDateRange,
    MetricsNotComputed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",

            // Auth/OAuth
            Self::OAuthError => "E1001",
            Self::TokenExchangeFailed => "E1002",
            Self::TokenRefreshFailed => "E1003",
            Self::AthleteMissing => "E1004",
            Self::UserNotFound => "E1005",

            // Strava sync
            Self::StravaApiError => "E2001",
            Self::StravaRateLimited => "E2002",
            Self::ActivityNotFound => "E2003",
            Self::ActivityAlreadyExists => "E2004",
            Self::QueueError => "E2005",

            // Webhook
            Self::SignatureMissing => "E3001",
            Self::SignatureInvalid => "E3002",
            Self::VerifyTokenMismatch => "E3003",
            Self::MalformedEvent => "E3004",

            // Metrics
            Self::InvalidDateRange => "E4001",
            Self::MetricsNotComputed => "E4002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable | Self::QueueError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ValidationError
            | Self::BadRequest
            | Self::MalformedEvent
            | Self::InvalidDateRange => StatusCode::BAD_REQUEST,
            Self::NotFound
            | Self::UserNotFound
            | Self::ActivityNotFound
            | Self::MetricsNotComputed => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::SignatureMissing | Self::SignatureInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden | Self::VerifyTokenMismatch => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::StravaRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ActivityAlreadyExists => StatusCode::CONFLICT,
            Self::OAuthError | Self::TokenExchangeFailed | Self::TokenRefreshFailed
            | Self::AthleteMissing => StatusCode::BAD_REQUEST,
            Self::StravaApiError => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_codes_map_to_auth_statuses() {
        assert_eq!(ErrorCode::SignatureMissing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::SignatureInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::VerifyTokenMismatch.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_errors_are_not_client_errors() {
        assert_eq!(ErrorCode::StravaApiError.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::StravaRateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::InternalError.code(), "E0001");
        assert_eq!(ErrorCode::OAuthError.code(), "E1001");
        assert_eq!(ErrorCode::StravaApiError.code(), "E2001");
        assert_eq!(ErrorCode::SignatureMissing.code(), "E3001");
    }
}
