//! City search box behaviour: debounced lookups, rate-limit retries and
//! keyboard navigation over the suggestion list.

pub mod controller;
pub mod session;

pub use controller::{
    AutocompleteController, Command, Key, Panel, Phase, RetryState, SearchTicket,
};
pub use session::Autocomplete;
