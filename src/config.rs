use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub rapid_api_key: Option<String>,
    pub geodb_base_url: String,
    pub geodb_cities_path: String,
    pub geodb_host: String,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_current_path: String,
    pub openweather_forecast_path: String,
    pub city_cache_ttl_secs: u64,
    pub city_cache_max_entries: usize,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            rapid_api_key: optional_var("RAPID_API_KEY"),
            geodb_base_url: env::var("GEODB_BASE_URL")
                .unwrap_or_else(|_| "https://wft-geo-db.p.rapidapi.com".to_string()),
            geodb_cities_path: env::var("GEODB_CITIES_PATH")
                .unwrap_or_else(|_| "/v1/geo/cities".to_string()),
            geodb_host: env::var("GEODB_HOST")
                .unwrap_or_else(|_| "wft-geo-db.p.rapidapi.com".to_string()),
            openweather_api_key: optional_var("API_KEY"),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_current_path: env::var("OPENWEATHER_CURRENT_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_forecast_path: env::var("OPENWEATHER_FORECAST_PATH")
                .unwrap_or_else(|_| "/data/2.5/forecast".to_string()),
            city_cache_ttl_secs: parsed_var("CITY_CACHE_TTL_SECS", 60 * 60)?,
            city_cache_max_entries: parsed_var("CITY_CACHE_MAX_ENTRIES", 100)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    /// Defaults for every upstream, with no API keys configured.
    pub fn with_base_urls(geodb_base_url: &str, openweather_base_url: &str) -> Self {
        Config {
            rapid_api_key: None,
            geodb_base_url: geodb_base_url.to_string(),
            geodb_cities_path: "/v1/geo/cities".to_string(),
            geodb_host: "wft-geo-db.p.rapidapi.com".to_string(),
            openweather_api_key: None,
            openweather_base_url: openweather_base_url.to_string(),
            openweather_current_path: "/data/2.5/weather".to_string(),
            openweather_forecast_path: "/data/2.5/forecast".to_string(),
            city_cache_ttl_secs: 60 * 60,
            city_cache_max_entries: 100,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    pub fn city_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.city_cache_ttl_secs)
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
