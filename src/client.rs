use crate::cities::{
    read_search_response, suggestions_from, CitySearch, CitySuggestion, SearchError,
};
use crate::forecast::WeatherViewModel;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Weather data could not be retrieved")]
    WeatherUnavailable,
}

/// Talks to this server's own `/api` endpoints, the way the search page does.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_weather(&self, city: &str) -> Result<WeatherViewModel, ClientError> {
        let response = self
            .client
            .get(format!("{}/api/weather", self.base_url))
            .query(&[("city", city)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("Weather request for {:?} failed: {}", city, response.status());
            return Err(ClientError::WeatherUnavailable);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CitySearch for ApiClient {
    async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, SearchError> {
        let response = self
            .client
            .get(format!("{}/api/cities", self.base_url))
            .query(&[("query", query)])
            .send()
            .await?;

        let body = read_search_response(response).await?;
        suggestions_from(&body)
    }
}
