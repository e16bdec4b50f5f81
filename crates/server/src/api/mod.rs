pub mod download;
pub mod handlers;
pub mod routes;

pub use routes::create_router;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Error body shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub error: String,
}

impl ErrorBody {
    pub fn new(code: &str, error: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
        let status = match code {
            "invalid_url" | "unsupported_domain" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "extraction_failed" => StatusCode::NOT_FOUND,
            "timed_out" => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                code: code.to_string(),
                error: error.into(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_status_mapping() {
        assert_eq!(ErrorBody::new("invalid_url", "x").0, StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorBody::new("unsupported_domain", "x").0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorBody::new("rate_limited", "x").0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorBody::new("extraction_failed", "x").0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorBody::new("timed_out", "x").0,
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ErrorBody::new("internal_error", "x").0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
