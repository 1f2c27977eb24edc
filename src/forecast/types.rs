use serde::{Deserialize, Serialize};

/// `GET /data/2.5/weather` response, trimmed to the fields the view model uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub name: Option<String>,
    pub main: CurrentMain,
    pub wind: Wind,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub main: Option<String>,
    pub description: String,
    pub icon: String,
}

/// `GET /data/2.5/forecast` response: 3-hour steps over five days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hResponse {
    pub list: Vec<Forecast3hItem>,
    #[serde(default)]
    pub city: Option<Forecast3hCity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hItem {
    pub dt: i64,
    pub main: Forecast3hMain,
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hCity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherViewModel {
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub temp: f64,
    pub description: String,
    pub icon: String,
}
