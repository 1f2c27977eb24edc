use crate::autocomplete::controller::MAX_RETRIES;
use crate::autocomplete::Panel;
use crate::cities::CitySuggestion;
use crate::forecast::types::{DailyForecast, WeatherViewModel};
use chrono::NaiveDate;
use std::fmt::Write;

const ICON_BASE_URL: &str = "http://openweathermap.org/img/wn";

/// Renders the weather card: current conditions followed by one line per
/// forecast day.
pub fn render_weather(view: &WeatherViewModel) -> String {
    let current = &view.current;
    let mut out = String::new();

    let _ = writeln!(out, "{}°", current.temp.round());
    let _ = writeln!(out, "{}", capitalize(&current.description));
    let _ = writeln!(out, "{}/{}@2x.png", ICON_BASE_URL, current.icon);
    let _ = writeln!(
        out,
        "Feels like: {}°  Humidity: {}%  Wind: {} m/s",
        current.feels_like.round(),
        current.humidity.round(),
        current.wind_speed
    );

    for day in &view.forecast {
        let _ = writeln!(out, "{}", forecast_line(day));
    }
    out
}

/// Loading placeholder, the card, or nothing when there is no data yet.
pub fn render_weather_state(view: Option<&WeatherViewModel>, loading: bool) -> String {
    if loading {
        return "Loading...".to_string();
    }
    view.map(render_weather).unwrap_or_default()
}

/// Renders the suggestion panel. Parts of each city name matching `query`
/// are wrapped in brackets.
pub fn render_panel(panel: &Panel<'_>, query: &str) -> String {
    match panel {
        Panel::Hidden => String::new(),
        Panel::Loading { retry_attempt: 0 } => "Searching cities...".to_string(),
        Panel::Loading { retry_attempt } => {
            format!("Retrying... (Attempt {}/{})", retry_attempt, MAX_RETRIES)
        }
        Panel::Suggestions { items, highlighted } => items
            .iter()
            .enumerate()
            .map(|(i, city)| {
                let marker = if *highlighted == Some(i) { "> " } else { "  " };
                format!("{}{}", marker, suggestion_line(city, query))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Panel::Empty { searched: true } => "No cities found".to_string(),
        Panel::Empty { searched: false } => "Type to search cities".to_string(),
    }
}

fn suggestion_line(city: &CitySuggestion, query: &str) -> String {
    let mut line = highlight_match(&city.name, query);
    let location = match &city.state {
        Some(state) if !state.is_empty() => format!("{}, {}", state, city.country),
        _ => city.country.clone(),
    };
    let _ = write!(line, "  {}", location);
    if city.population > 0 {
        let _ = write!(line, " • {} residents", format_thousands(city.population));
    }
    line
}

fn highlight_match(text: &str, query: &str) -> String {
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 2);
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match match_len(rest, &needle) {
            Some(len) => {
                let _ = write!(out, "[{}]", &rest[..len]);
                rest = &rest[len..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// Byte length of the prefix of `text` that equals `needle`, ignoring case.
fn match_len(text: &str, needle: &[char]) -> Option<usize> {
    let mut lowered = Vec::with_capacity(needle.len());
    for (i, c) in text.char_indices() {
        lowered.extend(c.to_lowercase());
        if lowered.len() >= needle.len() {
            return (lowered == needle).then(|| i + c.len_utf8());
        }
    }
    None
}

fn forecast_line(day: &DailyForecast) -> String {
    let weekday = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
        .map(|date| date.format("%a").to_string())
        .unwrap_or_else(|_| day.date.clone());
    format!(
        "{}  {}/{}.png  {}°",
        weekday,
        ICON_BASE_URL,
        day.icon,
        day.temp.round()
    )
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
