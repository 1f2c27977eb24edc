use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    cache::TtlCache,
    cities::{geodb::GeoDbClient, SearchError},
    config::Config,
    error::ApiError,
    forecast::{OpenWeatherClient, WeatherViewModel},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub city_client: Arc<GeoDbClient>,
    pub weather_client: Arc<OpenWeatherClient>,
    pub city_cache: Arc<TtlCache<Value>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let city_cache = TtlCache::new(config.city_cache_ttl(), config.city_cache_max_entries);
        Ok(Self {
            city_client: Arc::new(GeoDbClient::new(config.clone())?),
            weather_client: Arc::new(OpenWeatherClient::new(config.clone())?),
            city_cache: Arc::new(city_cache),
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn search_cities(
    State(state): State<AppState>,
    Query(params): Query<CitiesQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = params
        .query
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::Validation("Query parameter is required"))?;

    let client = state.city_client.clone();
    let body = state
        .city_cache
        .get_or_try_insert_with(&query, || async { client.search_raw(&query).await })
        .await;

    match body {
        Ok(body) => Ok(Json(body)),
        Err(SearchError::RateLimited { message }) => {
            tracing::warn!("City search for {:?} rate limited: {}", query, message);
            Err(ApiError::RateLimited)
        }
        Err(e) => {
            tracing::error!("Error fetching cities for {:?}: {}", query, e);
            Err(ApiError::Upstream("Failed to fetch cities"))
        }
    }
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherViewModel>, ApiError> {
    let city = params
        .city
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::Validation("City parameter is required"))?;

    match state.weather_client.get_weather(&city).await {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            tracing::error!("Error fetching weather for {:?}: {}", city, e);
            Err(ApiError::Upstream("Failed to fetch weather data"))
        }
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cities", get(search_cities))
        .route("/api/weather", get(get_weather))
        .with_state(state)
}
