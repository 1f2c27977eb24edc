use super::types::*;
use super::WeatherError;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::collections::HashSet;

pub const FORECAST_DAYS: usize = 5;

/// Combines current conditions and the 3-hour forecast into one view model.
pub fn merge_weather_data(
    current: &CurrentResponse,
    forecast: &Forecast3hResponse,
) -> Result<WeatherViewModel, WeatherError> {
    let condition = current.weather.first().ok_or_else(|| {
        WeatherError::MalformedResponse("current weather has no conditions".to_string())
    })?;

    let offset = forecast
        .city
        .as_ref()
        .and_then(|city| city.timezone)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());

    let forecast = group_by_day(&forecast.list, offset)
        .into_iter()
        .skip(1) // rest of today
        .filter_map(|(date, item)| {
            let condition = item.weather.first()?;
            Some(DailyForecast {
                date: date.format("%Y-%m-%d").to_string(),
                temp: item.main.temp,
                description: condition.description.clone(),
                icon: condition.icon.clone(),
            })
        })
        .take(FORECAST_DAYS)
        .collect();

    Ok(WeatherViewModel {
        current: CurrentConditions {
            temp: current.main.temp,
            feels_like: current.main.feels_like,
            humidity: current.main.humidity,
            wind_speed: current.wind.speed,
            description: condition.description.clone(),
            icon: condition.icon.clone(),
        },
        forecast,
    })
}

/// Keeps the first item seen for each local calendar date, in order of first
/// appearance. Items without any weather condition are passed over, so a day
/// is represented by its first usable record.
pub fn group_by_day(
    items: &[Forecast3hItem],
    offset: FixedOffset,
) -> Vec<(NaiveDate, &Forecast3hItem)> {
    let mut seen = HashSet::new();
    let mut days = Vec::new();

    for item in items {
        let Some(ts) = DateTime::from_timestamp(item.dt, 0) else {
            tracing::warn!("Skipping forecast item with invalid timestamp {}", item.dt);
            continue;
        };
        if item.weather.is_empty() {
            tracing::debug!("Skipping forecast item at {} with no conditions", item.dt);
            continue;
        }
        let date = ts.with_timezone(&offset).date_naive();
        if seen.insert(date) {
            days.push((date, item));
        }
    }

    days
}
