use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Failure of a single fetch strategy.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("static fetch timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("navigation timed out after {}ms", .0.as_millis())]
    NavigationTimeout(Duration),

    #[error("render failed: {0}")]
    Render(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Timeout(_) => "timeout",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::BrowserLaunch(_) => "browser_launch",
            FetchError::NavigationTimeout(_) => "navigation_timeout",
            FetchError::Render(_) => "render",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Scrape failed: {0}")]
    Scrape(#[from] FetchError),

    #[error("Request processing timed out after {}ms", .0.as_millis())]
    RequestTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse { error: msg, detail: None },
            ),
            AppError::Scrape(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Scrape failed".to_string(),
                    detail: Some(err.to_string()),
                },
            ),
            err @ AppError::RequestTimeout(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Scrape failed".to_string(),
                    detail: Some(err.to_string()),
                },
            ),
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Configuration error".to_string(),
                    detail: Some(msg),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
