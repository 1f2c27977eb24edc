use crate::cities::{CitySuggestion, SearchError};
use std::time::Duration;

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);
pub const RETRY_DELAY: Duration = Duration::from_secs(1);
pub const MAX_RETRIES: u8 = 3;
pub const BLUR_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Debouncing,
    Searching,
    RateLimitedRetrying,
    Settled,
}

/// Identifies one search request. Results are applied only while the
/// ticket still describes the controller's current search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub session: u64,
    pub attempt: u8,
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u8,
    pub query: String,
}

/// Side effects requested by the controller. The caller owns timers and I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartDebounce { session: u64, delay: Duration },
    Search(SearchTicket),
    ScheduleRetry { ticket: SearchTicket, delay: Duration },
    ScheduleBlur { generation: u64, delay: Duration },
    Submit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// What the suggestion panel should show right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<'a> {
    Hidden,
    Loading { retry_attempt: u8 },
    Suggestions {
        items: &'a [CitySuggestion],
        highlighted: Option<usize>,
    },
    Empty { searched: bool },
}

/// Input state, debouncing, rate-limit retries and keyboard navigation for
/// the city search box.
///
/// Every method is synchronous and returns the [`Command`]s to carry out;
/// outcomes are fed back through [`debounce_elapsed`](Self::debounce_elapsed),
/// [`search_resolved`](Self::search_resolved),
/// [`retry_elapsed`](Self::retry_elapsed) and
/// [`blur_elapsed`](Self::blur_elapsed).
#[derive(Debug, Default)]
pub struct AutocompleteController {
    input: String,
    phase: Phase,
    // Bumped whenever the input text changes; stale timers and results
    // carry an older value.
    session: u64,
    suggestions: Vec<CitySuggestion>,
    has_results: bool,
    searched: bool,
    panel_open: bool,
    highlighted: Option<usize>,
    focused: bool,
    blur_generation: u64,
    retry: RetryState,
}

impl AutocompleteController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn suggestions(&self) -> &[CitySuggestion] {
        &self.suggestions
    }

    pub fn has_results(&self) -> bool {
        self.has_results
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub fn panel(&self) -> Panel<'_> {
        if !self.focused {
            return Panel::Hidden;
        }
        if matches!(self.phase, Phase::Searching | Phase::RateLimitedRetrying) {
            return Panel::Loading {
                retry_attempt: self.retry.attempt,
            };
        }
        if !self.panel_open {
            return Panel::Hidden;
        }
        if self.suggestions.is_empty() {
            Panel::Empty {
                searched: self.searched,
            }
        } else {
            Panel::Suggestions {
                items: &self.suggestions,
                highlighted: self.highlighted,
            }
        }
    }

    pub fn input_changed(&mut self, text: &str) -> Vec<Command> {
        self.input = text.to_string();
        self.session += 1;
        self.highlighted = None;

        if text.trim().is_empty() {
            self.clear_suggestions();
            self.phase = Phase::Idle;
            return Vec::new();
        }

        self.phase = Phase::Debouncing;
        vec![Command::StartDebounce {
            session: self.session,
            delay: DEBOUNCE_DELAY,
        }]
    }

    pub fn debounce_elapsed(&mut self, session: u64) -> Vec<Command> {
        if session != self.session || self.phase != Phase::Debouncing {
            return Vec::new();
        }

        let query = self.input.trim().to_string();
        if query.is_empty() {
            self.clear_suggestions();
            self.phase = Phase::Idle;
            return Vec::new();
        }

        self.retry = RetryState {
            attempt: 0,
            query: query.clone(),
        };
        self.phase = Phase::Searching;
        vec![Command::Search(SearchTicket {
            session,
            attempt: 0,
            query,
        })]
    }

    pub fn search_resolved(
        &mut self,
        ticket: SearchTicket,
        result: Result<Vec<CitySuggestion>, SearchError>,
    ) -> Vec<Command> {
        if !self.is_current(&ticket) {
            tracing::debug!("Discarding stale city results for {:?}", ticket.query);
            return Vec::new();
        }

        match result {
            Ok(cities) => {
                self.has_results = !cities.is_empty();
                self.suggestions = cities;
                self.searched = true;
                self.panel_open = true;
                self.highlighted = None;
                self.retry.attempt = 0;
                self.phase = Phase::Settled;
                Vec::new()
            }
            Err(e) if e.is_rate_limited() => {
                self.suggestions.clear();
                self.has_results = false;
                self.highlighted = None;

                if self.retry.attempt >= MAX_RETRIES {
                    tracing::warn!(
                        "Giving up on {:?} after {} rate-limited attempts",
                        ticket.query,
                        self.retry.attempt + 1
                    );
                    self.searched = true;
                    self.phase = Phase::Settled;
                    return Vec::new();
                }

                self.retry.attempt += 1;
                self.phase = Phase::RateLimitedRetrying;
                tracing::warn!(
                    "City search rate limited, retrying {:?} in {:?} (attempt {}/{})",
                    self.retry.query,
                    RETRY_DELAY,
                    self.retry.attempt,
                    MAX_RETRIES
                );
                vec![Command::ScheduleRetry {
                    ticket: SearchTicket {
                        session: self.session,
                        attempt: self.retry.attempt,
                        query: self.retry.query.clone(),
                    },
                    delay: RETRY_DELAY,
                }]
            }
            Err(e) => {
                tracing::error!("Error fetching cities for {:?}: {}", ticket.query, e);
                self.suggestions.clear();
                self.has_results = false;
                self.highlighted = None;
                self.searched = true;
                self.phase = Phase::Settled;
                Vec::new()
            }
        }
    }

    pub fn retry_elapsed(&mut self, ticket: SearchTicket) -> Vec<Command> {
        if ticket.session != self.session
            || self.phase != Phase::RateLimitedRetrying
            || ticket.attempt != self.retry.attempt
        {
            return Vec::new();
        }

        self.phase = Phase::Searching;
        vec![Command::Search(ticket)]
    }

    pub fn key_pressed(&mut self, key: Key) -> Vec<Command> {
        match key {
            Key::Enter => match self.highlighted {
                Some(index) => self.commit(index),
                None => self.submit(),
            },
            _ if !self.panel_open => Vec::new(),
            Key::ArrowDown => {
                let last = self.suggestions.len().checked_sub(1);
                self.highlighted = match (self.highlighted, last) {
                    (_, None) => None,
                    (None, Some(_)) => Some(0),
                    (Some(index), Some(last)) => Some((index + 1).min(last)),
                };
                Vec::new()
            }
            Key::ArrowUp => {
                self.highlighted = self.highlighted.and_then(|index| index.checked_sub(1));
                Vec::new()
            }
            Key::Escape => {
                self.panel_open = false;
                self.highlighted = None;
                Vec::new()
            }
        }
    }

    /// Pointer moved over a suggestion.
    pub fn hover(&mut self, index: usize) {
        if self.panel_open && index < self.suggestions.len() {
            self.highlighted = Some(index);
        }
    }

    /// Picks a suggestion, by click or by Enter on the highlighted row.
    pub fn commit(&mut self, index: usize) -> Vec<Command> {
        let Some(name) = self.suggestions.get(index).map(|city| city.name.clone()) else {
            return Vec::new();
        };

        // Setting the text is not typing: no new search, and anything in
        // flight is now stale.
        self.input = name.clone();
        self.session += 1;
        self.phase = Phase::Idle;
        self.panel_open = false;
        self.highlighted = None;
        vec![Command::Submit(name)]
    }

    pub fn submit(&mut self) -> Vec<Command> {
        let city = self.input.trim();
        if city.is_empty() {
            return Vec::new();
        }

        let city = city.to_string();
        self.panel_open = false;
        self.highlighted = None;
        vec![Command::Submit(city)]
    }

    pub fn focus(&mut self) -> Vec<Command> {
        self.focused = true;
        self.blur_generation += 1;
        Vec::new()
    }

    /// Focus left the input. The panel stays up for [`BLUR_GRACE`] so a
    /// click on a suggestion still lands.
    pub fn blur(&mut self) -> Vec<Command> {
        self.blur_generation += 1;
        vec![Command::ScheduleBlur {
            generation: self.blur_generation,
            delay: BLUR_GRACE,
        }]
    }

    pub fn blur_elapsed(&mut self, generation: u64) -> Vec<Command> {
        if generation == self.blur_generation {
            self.focused = false;
        }
        Vec::new()
    }

    fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.session == self.session
            && self.phase == Phase::Searching
            && ticket.attempt == self.retry.attempt
            && ticket.query == self.input.trim()
    }

    fn clear_suggestions(&mut self) {
        self.suggestions.clear();
        self.has_results = false;
        self.searched = false;
        self.panel_open = false;
    }
}
