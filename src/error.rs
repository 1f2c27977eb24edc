use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please try again in a moment.";

/// Failures surfaced by the HTTP handlers, each with a fixed status and body.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    Upstream(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::RateLimited => json!({
                "error": "rate limit exceeded",
                "message": RATE_LIMIT_MESSAGE,
            }),
            ApiError::Validation(message) | ApiError::Upstream(message) => {
                json!({ "error": message })
            }
        };
        (self.status(), Json(body)).into_response()
    }
}
