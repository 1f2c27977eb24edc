use serde::{Deserialize, Serialize};

/// Body returned by the GeoDB `/geo/cities` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDbResponse {
    pub data: Vec<GeoDbCity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDbCity {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub population: u64,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<GeoDbCity> for CitySuggestion {
    fn from(city: GeoDbCity) -> Self {
        Self {
            name: city.city,
            country: city.country,
            state: city.region,
            population: city.population.unwrap_or(0),
            latitude: city.latitude,
            longitude: city.longitude,
        }
    }
}
