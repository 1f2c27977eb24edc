use super::merge::merge_weather_data;
use super::types::*;
use crate::config::Config;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("City not found: {0}")]
    NotFound(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("API_KEY not set")]
    MissingApiKey,
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("CityWeather/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// Current conditions plus the next five days for `city`.
    ///
    /// Both upstream calls run concurrently; either failing fails the whole
    /// lookup.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherViewModel, WeatherError> {
        let (current, forecast) =
            tokio::try_join!(self.get_current(city), self.get_forecast3h(city))?;
        merge_weather_data(&current, &forecast)
    }

    pub async fn get_current(&self, city: &str) -> Result<CurrentResponse, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_current_path
        );
        self.make_request(&url, city).await
    }

    pub async fn get_forecast3h(&self, city: &str) -> Result<Forecast3hResponse, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_forecast_path
        );
        self.make_request(&url, city).await
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        url: &str,
        city: &str,
    ) -> Result<T, WeatherError> {
        let api_key = self
            .config
            .openweather_api_key
            .as_deref()
            .ok_or(WeatherError::MissingApiKey)?;

        let response = self
            .client
            .get(url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let json: Value = response.json().await?;
                Ok(serde_json::from_value(json)?)
            }
            reqwest::StatusCode::NOT_FOUND => Err(WeatherError::NotFound(city.to_string())),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(WeatherError::ApiError(format!(
                    "HTTP {}: {}",
                    status, error_text
                )))
            }
        }
    }
}
