//! Core library for the `geoweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Reverse geocoding of coordinates into place-name queries
//! - The OpenWeather current-weather provider
//! - [`WeatherService`], which sequences the two and unifies their errors
//!
//! It is used by `geoweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod service;

pub use config::{Config, GeocoderConfig};
pub use error::{GeoError, WeatherError};
pub use geocode::{GeoResolver, NominatimGeocoder, ReverseGeocoder};
pub use model::{Coordinate, PlaceQuery, Placemark, QuerySelector, WeatherInfo};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use service::{WeatherResult, WeatherService};
