//! Gateway error type and its HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const NOT_FOUND_MESSAGE: &str = "Path not found. Please check your URL";

/// Errors the gateway itself turns into responses.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No mounted route matched (404).
    #[error("Path not found. Please check your URL")]
    NotFound,

    /// Request body declared as JSON did not parse (400).
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    /// Request body could not be read from the client (400).
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Request body exceeded the configured limit (413).
    #[error("Request body exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    /// The backend could not be reached or answered unreadably (502).
    #[error("Backend service unavailable: {0}")]
    Backend(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::InvalidJson(_) | GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Backend(e.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
