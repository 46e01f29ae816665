//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding (name search with language fallback, literal coordinates)
//! - The Open-Meteo weather provider and the mapping of its payloads
//! - Daily aggregation of hourly forecasts
//! - Debounced autocomplete suggestions
//! - Favorites, the home result list, theme preference and the contact form
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod contact;
pub mod error;
pub mod favorites;
pub mod geocode;
pub mod http;
pub mod mapper;
pub mod model;
pub mod provider;
pub mod results;
pub mod service;
pub mod suggest;
pub mod theme;

pub use config::Config;
pub use error::WeatherError;
pub use favorites::{Favorites, FavoritesStore};
pub use model::{Coordinates, DailyAggregate, Forecast, ResolvedLocation, WeatherReading};
pub use provider::{OpenMeteoClient, WeatherProvider};
pub use results::ResultList;
pub use service::WeatherService;
pub use theme::Theme;
