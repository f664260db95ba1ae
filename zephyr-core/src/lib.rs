//! Core library for the Zephyr weather app.
//!
//! This crate defines:
//! - The solar ephemeris calculator (sunrise/sunset/noon/nadir)
//! - Shared domain models and the weather-code taxonomy
//! - Abstraction over forecast providers (NWS, Open-Meteo)
//! - Settings, application state and the widget data bridge
//!
//! It is used by `zephyr-cli`, but can also be reused by other binaries or
//! services.

pub mod geocoding;
pub mod icons;
pub mod model;
pub mod provider;
pub mod settings;
pub mod store;
pub mod sun;
pub mod widget;

pub use model::{Location, Weather, WeatherCode};
pub use provider::{ProviderId, WeatherProvider};
pub use settings::AppSettings;
pub use store::AppState;
pub use sun::{SunTimes, daylight_duration_hours, sun_times};
