use super::{
    read_search_response, suggestions_from, CitySearch, CitySuggestion, SearchError,
    MAX_SUGGESTIONS,
};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Client for the GeoDB cities API on RapidAPI.
///
/// Makes exactly one request per search. Caching is left to the caller.
pub struct GeoDbClient {
    client: Client,
    config: Config,
}

impl GeoDbClient {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("CityWeather/1.0")
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, config })
    }

    /// Runs a name-prefix search and returns the upstream body untouched.
    pub async fn search_raw(&self, query: &str) -> Result<Value, SearchError> {
        let api_key = self
            .config
            .rapid_api_key
            .as_deref()
            .ok_or(SearchError::MissingApiKey)?;

        let url = format!(
            "{}{}",
            self.config.geodb_base_url, self.config.geodb_cities_path
        );
        let limit = MAX_SUGGESTIONS.to_string();

        let response = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.config.geodb_host)
            .query(&[
                ("namePrefix", query),
                ("limit", limit.as_str()),
                ("sort", "-population"),
            ])
            .send()
            .await?;

        read_search_response(response).await
    }
}

#[async_trait]
impl CitySearch for GeoDbClient {
    async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, SearchError> {
        let body = self.search_raw(query).await?;
        suggestions_from(&body)
    }
}
