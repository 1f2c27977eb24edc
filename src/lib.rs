pub mod autocomplete;
pub mod cache;
pub mod cities;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod forecast;
pub mod page;
pub mod routes;
