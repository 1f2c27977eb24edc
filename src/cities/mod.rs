pub mod geodb;
pub mod types;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use types::{GeoDbResponse, UpstreamErrorBody};

pub use types::CitySuggestion;

pub const MAX_SUGGESTIONS: u32 = 5;
pub const FETCH_CITIES_FAILED: &str = "Failed to fetch cities";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Rate limited: {message}")]
    RateLimited { message: String },
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("RAPID_API_KEY not set")]
    MissingApiKey,
}

impl SearchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SearchError::RateLimited { .. })
    }
}

/// A prefix search over cities, most populous first.
#[async_trait]
pub trait CitySearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, SearchError>;
}

/// Classifies a city search response and returns its JSON body on success.
///
/// The body must have the `{ "data": [...] }` shape; anything else counts as
/// an upstream failure.
pub(crate) async fn read_search_response(
    response: reqwest::Response,
) -> Result<Value, SearchError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = error_message(response)
            .await
            .unwrap_or_else(|| "Too many requests".to_string());
        return Err(SearchError::RateLimited { message });
    }

    if !status.is_success() {
        let message = error_message(response)
            .await
            .unwrap_or_else(|| FETCH_CITIES_FAILED.to_string());
        if message.to_lowercase().contains("rate limit") {
            return Err(SearchError::RateLimited { message });
        }
        return Err(SearchError::Upstream(message));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| SearchError::Upstream(format!("Malformed response: {}", e)))?;
    suggestions_from(&body)?;
    Ok(body)
}

pub(crate) fn suggestions_from(body: &Value) -> Result<Vec<CitySuggestion>, SearchError> {
    let response = GeoDbResponse::deserialize(body)
        .map_err(|e| SearchError::Upstream(format!("Malformed response: {}", e)))?;
    Ok(response.data.into_iter().map(CitySuggestion::from).collect())
}

async fn error_message(response: reqwest::Response) -> Option<String> {
    response
        .json::<UpstreamErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.is_empty())
}
