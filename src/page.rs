use crate::autocomplete::{Autocomplete, Key};
use crate::client::{ApiClient, ClientError};
use crate::display::{render_panel, render_weather_state};
use crate::forecast::WeatherViewModel;
use std::sync::Arc;
use tokio::sync::mpsc;

type Lookup = (String, Result<WeatherViewModel, ClientError>);

/// The search page: a city search box whose submissions load the weather
/// card below it.
///
/// Input is ignored while a weather lookup is in flight. A failed lookup is
/// logged and the previous card stays up.
pub struct WeatherPage {
    search: Autocomplete,
    submitted: mpsc::UnboundedReceiver<String>,
    api: ApiClient,
    lookups_tx: mpsc::UnboundedSender<Lookup>,
    lookups_rx: mpsc::UnboundedReceiver<Lookup>,
    weather: Option<WeatherViewModel>,
    loading: bool,
}

impl WeatherPage {
    pub fn new(api: ApiClient) -> Self {
        let (submitted_tx, submitted) = mpsc::unbounded_channel();
        let (lookups_tx, lookups_rx) = mpsc::unbounded_channel();
        Self {
            search: Autocomplete::new(Arc::new(api.clone()), submitted_tx),
            submitted,
            api,
            lookups_tx,
            lookups_rx,
            weather: None,
            loading: false,
        }
    }

    pub fn search(&self) -> &Autocomplete {
        &self.search
    }

    pub fn weather(&self) -> Option<&WeatherViewModel> {
        self.weather.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn focus(&mut self) {
        if !self.loading {
            self.search.focus();
        }
    }

    pub fn blur(&mut self) {
        self.search.blur();
    }

    pub fn type_text(&mut self, text: &str) {
        if self.loading {
            tracing::debug!("Ignoring input {:?} while weather loads", text);
            return;
        }
        self.search.type_text(text);
    }

    pub fn press(&mut self, key: Key) {
        if !self.loading {
            self.search.press(key);
        }
    }

    pub fn click(&mut self, index: usize) {
        if !self.loading {
            self.search.click(index);
        }
    }

    pub fn hover(&mut self, index: usize) {
        self.search.hover(index);
    }

    /// Starts lookups for cities already submitted, without blocking.
    pub fn process_submissions(&mut self) {
        while let Ok(city) = self.submitted.try_recv() {
            self.start_lookup(city);
        }
    }

    /// Waits for the next search event, submission or finished lookup.
    pub async fn step(&mut self) {
        tokio::select! {
            Some(city) = self.submitted.recv() => self.start_lookup(city),
            Some((city, result)) = self.lookups_rx.recv() => self.finish_lookup(&city, result),
            _ = self.search.step() => {}
        }
    }

    /// Steps until no search is pending and no weather lookup is in flight.
    pub async fn run_until_idle(&mut self) {
        loop {
            self.process_submissions();
            if !self.loading && !self.search.is_busy() {
                break;
            }
            self.step().await;
        }
    }

    /// Suggestion panel above the weather card, skipping whichever is empty.
    pub fn render(&self) -> String {
        let controller = self.search.controller();
        let panel = render_panel(&controller.panel(), controller.input());
        let weather = render_weather_state(self.weather.as_ref(), self.loading);

        [panel, weather]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn start_lookup(&mut self, city: String) {
        if self.loading {
            tracing::debug!("Weather already loading, dropping {:?}", city);
            return;
        }

        self.loading = true;
        let api = self.api.clone();
        let lookups = self.lookups_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_weather(&city).await;
            let _ = lookups.send((city, result));
        });
    }

    fn finish_lookup(&mut self, city: &str, result: Result<WeatherViewModel, ClientError>) {
        self.loading = false;
        match result {
            Ok(view) => {
                tracing::info!("Loaded weather for {}", city);
                self.weather = Some(view);
            }
            Err(e) => tracing::error!("Error fetching weather for {:?}: {}", city, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn weather_body(temp: f64, description: &str) -> Value {
        json!({
            "current": {"temp": temp, "feels_like": temp - 1.0, "humidity": 70.0,
                        "wind_speed": 3.2, "description": description, "icon": "04d"},
            "forecast": [
                {"date": "2024-03-11", "temp": 9.6, "description": "light rain", "icon": "10d"}
            ]
        })
    }

    async fn no_cities(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/cities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(server)
            .await;
    }

    fn page_for(server: &MockServer) -> WeatherPage {
        let mut page = WeatherPage::new(ApiClient::new(server.uri()).unwrap());
        page.focus();
        page
    }

    #[tokio::test]
    async fn test_choosing_a_suggestion_loads_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cities"))
            .and(query_param("query", "Par"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"city": "Paris", "country": "France", "region": "Île-de-France",
                     "population": 2148000, "latitude": 48.85, "longitude": 2.35}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("city", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(18.6, "overcast")))
            .expect(1)
            .mount(&server)
            .await;
        let mut page = page_for(&server);

        page.type_text("Par");
        page.run_until_idle().await;
        assert!(page.render().contains("[Par]is  Île-de-France, France"));

        page.press(Key::ArrowDown);
        page.press(Key::Enter);
        page.process_submissions();
        assert!(page.is_loading());
        assert_eq!(page.render(), "Loading...");

        page.run_until_idle().await;

        assert!(!page.is_loading());
        assert_eq!(page.search().controller().input(), "Paris");
        assert_eq!(page.weather().unwrap().current.description, "overcast");
        assert!(page.render().starts_with("19°\nOvercast"));
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_previous_weather() {
        let server = MockServer::start().await;
        no_cities(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("city", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(11.0, "drizzle")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("city", "Atlantis"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let mut page = page_for(&server);

        page.type_text("London");
        page.press(Key::Enter);
        page.run_until_idle().await;
        assert_eq!(page.weather().unwrap().current.description, "drizzle");

        page.type_text("Atlantis");
        page.press(Key::Enter);
        page.run_until_idle().await;

        assert!(!page.is_loading());
        assert_eq!(page.weather().unwrap().current.description, "drizzle");
    }

    #[tokio::test]
    async fn test_input_is_ignored_while_weather_loads() {
        let server = MockServer::start().await;
        no_cities(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(weather_body(2.0, "snow"))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let mut page = page_for(&server);

        page.type_text("Oslo");
        page.press(Key::Enter);
        page.process_submissions();
        assert!(page.is_loading());

        page.type_text("Bergen");
        page.press(Key::Enter);
        assert_eq!(page.search().controller().input(), "Oslo");

        page.run_until_idle().await;
        assert_eq!(page.weather().unwrap().current.description, "snow");

        page.type_text("Bergen");
        assert_eq!(page.search().controller().input(), "Bergen");
    }
}
