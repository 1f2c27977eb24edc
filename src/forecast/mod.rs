pub mod merge;
#[cfg(test)]
pub mod mock;
pub mod openweather;
pub mod types;

pub use openweather::{OpenWeatherClient, WeatherError};
pub use types::WeatherViewModel;
