use super::types::*;
use chrono::{DateTime, Duration, Timelike, Utc};

pub fn mock_current() -> CurrentResponse {
    CurrentResponse {
        name: Some("London".to_string()),
        main: CurrentMain {
            temp: 18.4,
            feels_like: 17.9,
            humidity: 64.0,
        },
        wind: Wind {
            speed: 4.1,
            deg: Some(240.0),
            gust: None,
        },
        weather: vec![Condition {
            id: Some(802),
            main: Some("Clouds".to_string()),
            description: "scattered clouds".to_string(),
            icon: "03d".to_string(),
        }],
    }
}

/// `count` forecast items three hours apart, starting at `start`.
pub fn mock_forecast(start: DateTime<Utc>, count: usize, timezone: i32) -> Forecast3hResponse {
    let list = (0..count)
        .map(|i| {
            let target_time = start + Duration::hours(3 * i as i64);
            let temp = 12.0 + 6.0 * (i as f64 * 0.26).sin() + i as f64 * 0.01;
            let rainy = i % 8 == 0;
            let daylight = target_time.hour() >= 6 && target_time.hour() < 18;
            let suffix = if daylight { "d" } else { "n" };

            Forecast3hItem {
                dt: target_time.timestamp(),
                main: Forecast3hMain {
                    temp,
                    feels_like: Some(temp - 1.0),
                    humidity: Some(70.0),
                },
                weather: vec![Condition {
                    id: Some(if rainy { 500 } else { 800 }),
                    main: Some(if rainy { "Rain" } else { "Clear" }.to_string()),
                    description: if rainy { "light rain" } else { "clear sky" }.to_string(),
                    icon: format!("{}{}", if rainy { "10" } else { "01" }, suffix),
                }],
                dt_txt: Some(target_time.format("%Y-%m-%d %H:%M:%S").to_string()),
            }
        })
        .collect();

    Forecast3hResponse {
        list,
        city: Some(Forecast3hCity {
            name: Some("London".to_string()),
            country: Some("GB".to_string()),
            timezone: Some(timezone),
        }),
    }
}
