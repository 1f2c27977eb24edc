use super::controller::{AutocompleteController, Command, Key, Phase, SearchTicket};
use crate::cities::{CitySearch, CitySuggestion, SearchError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
enum Event {
    DebounceElapsed(u64),
    SearchResolved(SearchTicket, Result<Vec<CitySuggestion>, SearchError>),
    RetryElapsed(SearchTicket),
    BlurElapsed(u64),
}

/// Runs an [`AutocompleteController`] on tokio timers against a
/// [`CitySearch`] backend.
///
/// City names chosen by the user are sent on the `submitted` channel.
pub struct Autocomplete {
    controller: AutocompleteController,
    search: Arc<dyn CitySearch>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    submitted: mpsc::UnboundedSender<String>,
}

impl Autocomplete {
    pub fn new(search: Arc<dyn CitySearch>, submitted: mpsc::UnboundedSender<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            controller: AutocompleteController::new(),
            search,
            events_tx,
            events_rx,
            submitted,
        }
    }

    pub fn controller(&self) -> &AutocompleteController {
        &self.controller
    }

    pub fn type_text(&mut self, text: &str) {
        let commands = self.controller.input_changed(text);
        self.execute(commands);
    }

    pub fn press(&mut self, key: Key) {
        let commands = self.controller.key_pressed(key);
        self.execute(commands);
    }

    pub fn click(&mut self, index: usize) {
        let commands = self.controller.commit(index);
        self.execute(commands);
    }

    pub fn hover(&mut self, index: usize) {
        self.controller.hover(index);
    }

    pub fn submit(&mut self) {
        let commands = self.controller.submit();
        self.execute(commands);
    }

    pub fn focus(&mut self) {
        let commands = self.controller.focus();
        self.execute(commands);
    }

    pub fn blur(&mut self) {
        let commands = self.controller.blur();
        self.execute(commands);
    }

    /// Waits for the next timer or search completion and applies it.
    pub async fn step(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    /// Applies every event that is already waiting, without blocking.
    pub fn process_ready(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
        }
    }

    /// True while a debounce, search or retry is pending.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.controller.phase(),
            Phase::Debouncing | Phase::Searching | Phase::RateLimitedRetrying
        )
    }

    /// Steps until the current query has settled, succeeded or given up.
    pub async fn run_until_settled(&mut self) {
        while self.is_busy() {
            self.step().await;
        }
    }

    fn handle(&mut self, event: Event) {
        let commands = match event {
            Event::DebounceElapsed(session) => self.controller.debounce_elapsed(session),
            Event::SearchResolved(ticket, result) => {
                self.controller.search_resolved(ticket, result)
            }
            Event::RetryElapsed(ticket) => self.controller.retry_elapsed(ticket),
            Event::BlurElapsed(generation) => self.controller.blur_elapsed(generation),
        };
        self.execute(commands);
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::StartDebounce { session, delay } => {
                    self.after(delay, Event::DebounceElapsed(session))
                }
                Command::Search(ticket) => {
                    let search = self.search.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let result = search.search(&ticket.query).await;
                        let _ = events.send(Event::SearchResolved(ticket, result));
                    });
                }
                Command::ScheduleRetry { ticket, delay } => {
                    self.after(delay, Event::RetryElapsed(ticket))
                }
                Command::ScheduleBlur { generation, delay } => {
                    self.after(delay, Event::BlurElapsed(generation))
                }
                Command::Submit(city) => {
                    tracing::info!("City search submitted: {}", city);
                    if self.submitted.send(city).is_err() {
                        tracing::warn!("Submitted city dropped, receiver is gone");
                    }
                }
            }
        }
    }

    fn after(&self, delay: Duration, event: Event) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autocomplete::controller::Panel;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    type Reply = (Duration, Result<Vec<CitySuggestion>, SearchError>);

    /// Answers searches from a script, in call order.
    struct ScriptedSearch {
        script: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedSearch {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(q, _)| q.clone()).collect()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl CitySearch for ScriptedSearch {
        async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, SearchError> {
            self.calls.lock().push((query.to_string(), Instant::now()));
            let next = self.script.lock().pop_front();
            match next {
                Some((delay, reply)) => {
                    tokio::time::sleep(delay).await;
                    reply
                }
                None => Ok(Vec::new()),
            }
        }
    }

    fn city(name: &str) -> CitySuggestion {
        CitySuggestion {
            name: name.to_string(),
            country: "France".to_string(),
            state: Some("Île-de-France".to_string()),
            population: 2_148_000,
            latitude: 48.85,
            longitude: 2.35,
        }
    }

    fn now(reply: Result<Vec<CitySuggestion>, SearchError>) -> Reply {
        (Duration::ZERO, reply)
    }

    fn rate_limited() -> Result<Vec<CitySuggestion>, SearchError> {
        Err(SearchError::RateLimited {
            message: "Too many requests".to_string(),
        })
    }

    fn session_with(
        search: Arc<ScriptedSearch>,
    ) -> (Autocomplete, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Autocomplete::new(search, tx);
        session.focus();
        (session, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_typing_triggers_one_search() {
        let search = ScriptedSearch::new(vec![now(Ok(vec![city("Paris")]))]);
        let (mut session, _rx) = session_with(search.clone());

        for text in ["P", "Pa", "Par", "Pari", "Paris"] {
            session.type_text(text);
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        session.run_until_settled().await;

        assert_eq!(search.queries(), vec!["Paris"]);
        assert_eq!(session.controller().suggestions(), &[city("Paris")]);
        assert!(session.controller().has_results());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_waits_for_quiet_period() {
        let search = ScriptedSearch::new(vec![]);
        let (mut session, _rx) = session_with(search.clone());
        let started = Instant::now();

        session.type_text("Oslo");
        session.run_until_settled().await;

        let times = search.call_times();
        assert_eq!(times.len(), 1);
        let waited = times[0] - started;
        assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_four_rate_limited_attempts() {
        let search = ScriptedSearch::new(vec![
            now(rate_limited()),
            now(rate_limited()),
            now(rate_limited()),
            now(rate_limited()),
            now(Ok(vec![city("Paris")])),
        ]);
        let (mut session, _rx) = session_with(search.clone());

        session.type_text("Paris");
        session.run_until_settled().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        session.process_ready();

        assert_eq!(search.queries(), vec!["Paris"; 4]);
        assert_eq!(session.controller().phase(), Phase::Settled);
        assert!(session.controller().suggestions().is_empty());

        let times = search.call_times();
        for pair in times.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(1) && gap < Duration::from_millis(1010));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_three_rate_limits() {
        let search = ScriptedSearch::new(vec![
            now(rate_limited()),
            now(rate_limited()),
            now(rate_limited()),
            now(Ok(vec![city("Paris")])),
        ]);
        let (mut session, _rx) = session_with(search.clone());

        session.type_text("Paris");
        session.run_until_settled().await;

        assert_eq!(search.queries().len(), 4);
        assert_eq!(session.controller().suggestions().len(), 1);
        assert_eq!(session.controller().retry_state().attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_for_old_query_is_dropped() {
        let search = ScriptedSearch::new(vec![
            (Duration::from_secs(2), Ok(vec![city("Parma")])),
            now(Ok(vec![city("Paris")])),
        ]);
        let (mut session, _rx) = session_with(search.clone());

        session.type_text("Par");
        session.step().await; // debounce fires, slow search starts
        session.type_text("Paris");
        session.run_until_settled().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        session.process_ready();

        assert_eq!(search.queries(), vec!["Par", "Paris"]);
        assert_eq!(session.controller().suggestions(), &[city("Paris")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_during_blur_grace_submits() {
        let search = ScriptedSearch::new(vec![now(Ok(vec![city("Paris")]))]);
        let (mut session, mut rx) = session_with(search);

        session.type_text("Par");
        session.run_until_settled().await;
        session.blur();
        tokio::time::advance(Duration::from_millis(50)).await;
        session.click(0);

        assert_eq!(rx.recv().await.as_deref(), Some("Paris"));
        assert_eq!(session.controller().input(), "Paris");

        session.step().await;
        assert!(!session.controller().is_focused());
        assert_eq!(session.controller().panel(), Panel::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_submits_typed_text() {
        let search = ScriptedSearch::new(vec![]);
        let (mut session, mut rx) = session_with(search.clone());

        session.type_text(" Reykjavik ");
        session.press(Key::Enter);

        assert_eq!(rx.recv().await.as_deref(), Some("Reykjavik"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_never_searches() {
        let search = ScriptedSearch::new(vec![]);
        let (mut session, _rx) = session_with(search.clone());

        session.type_text("   ");
        session.run_until_settled().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.process_ready();

        assert!(search.queries().is_empty());
        assert_eq!(session.controller().phase(), Phase::Idle);
    }
}
