use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    FetchError { status: StatusCode, message: String },

    #[error("No text content available for analysis.")]
    NoContent,

    #[error("Error from OpenRouter API (status {status}): {body}")]
    UpstreamError { status: u16, body: String },

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("Invalid response format from OpenRouter API: {0}")]
    UpstreamFormatError(String),

    #[error("Request processing timed out")]
    RequestTimeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::NoContent => StatusCode::BAD_REQUEST,
            AppError::FetchError { status, .. } => *status,
            AppError::UpstreamUnavailable(_) | AppError::RequestTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            AppError::UpstreamError { .. }
            | AppError::UpstreamFormatError(_)
            | AppError::ConfigError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        response::error(self.status_code(), self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Error fetching or scraping URL: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NoContent.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UpstreamUnavailable("down".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::UpstreamError { status: 401, body: "nope".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::UpstreamFormatError("missing choices".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::RequestTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn fetch_error_carries_its_own_status() {
        let err = AppError::FetchError {
            status: StatusCode::BAD_REQUEST,
            message: "Could not fetch website content.".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Could not fetch website content.");
    }

    #[test]
    fn upstream_error_message_includes_body() {
        let err = AppError::UpstreamError { status: 401, body: "invalid key".into() };
        assert!(err.to_string().contains("invalid key"));
        assert!(err.to_string().contains("401"));
    }
}
