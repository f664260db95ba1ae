//! Shared domain model.
//!
//! Provider adapters normalize their upstream payloads into these types.
//! Every quantity is stored metric (°C, km/h, hPa, mm, km); converting to
//! the user's display units is the settings layer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Normalized weather condition, shared by both providers and by every
/// presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherCode {
    Clear,
    PartlyCloudy,
    Cloudy,
    RainLight,
    Rain,
    RainHeavy,
    SnowLight,
    Snow,
    SnowHeavy,
    Sleet,
    Hail,
    Thunderstorm,
    Fog,
    Haze,
    Wind,
}

impl WeatherCode {
    /// Human-readable condition text.
    pub fn description(self) -> &'static str {
        match self {
            WeatherCode::Clear => "Clear sky",
            WeatherCode::PartlyCloudy => "Partly cloudy",
            WeatherCode::Cloudy => "Cloudy",
            WeatherCode::RainLight => "Light rain",
            WeatherCode::Rain => "Rain",
            WeatherCode::RainHeavy => "Heavy rain",
            WeatherCode::SnowLight => "Light snow",
            WeatherCode::Snow => "Snow",
            WeatherCode::SnowHeavy => "Heavy snow",
            WeatherCode::Sleet => "Sleet",
            WeatherCode::Hail => "Hail",
            WeatherCode::Thunderstorm => "Thunderstorm",
            WeatherCode::Fog => "Fog",
            WeatherCode::Haze => "Haze",
            WeatherCode::Wind => "Windy",
        }
    }

    /// Lowercase key used by the widget surface, e.g. `partly_cloudy`.
    pub fn widget_key(self) -> &'static str {
        match self {
            WeatherCode::Clear => "clear",
            WeatherCode::PartlyCloudy => "partly_cloudy",
            WeatherCode::Cloudy => "cloudy",
            WeatherCode::RainLight => "rain_light",
            WeatherCode::Rain => "rain",
            WeatherCode::RainHeavy => "rain_heavy",
            WeatherCode::SnowLight => "snow_light",
            WeatherCode::Snow => "snow",
            WeatherCode::SnowHeavy => "snow_heavy",
            WeatherCode::Sleet => "sleet",
            WeatherCode::Hail => "hail",
            WeatherCode::Thunderstorm => "thunderstorm",
            WeatherCode::Fog => "fog",
            WeatherCode::Haze => "haze",
            WeatherCode::Wind => "wind",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    ThirdQuarter,
    WaningCrescent,
}

/// Degrees Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub temperature: Option<f64>,
    pub apparent: Option<f64>,
}

/// Speeds in km/h, direction in degrees from north.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub direction: Option<f64>,
    pub gusts: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Uv {
    pub index: Option<f64>,
}

/// Pollutant concentrations in µg/m³, plus a composite index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub so2: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub co: Option<f64>,
    pub aqi: Option<f64>,
}

/// Pollen concentrations in grains/m³.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollen {
    pub grass: Option<f64>,
    pub ragweed: Option<f64>,
    pub tree: Option<f64>,
}

/// Millimeters of accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    pub total: Option<f64>,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
}

/// Probability in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationProbability {
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sun {
    pub rise_time: Option<DateTime<Utc>>,
    pub set_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Moon {
    pub phase: Option<MoonPhase>,
}

/// Conditions for one half of a day (daytime or nighttime).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfDay {
    pub weather_code: Option<WeatherCode>,
    pub weather_text: Option<String>,
    pub temperature: Option<Temperature>,
    pub precipitation: Option<Precipitation>,
    pub precipitation_probability: Option<PrecipitationProbability>,
    pub wind: Option<Wind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Daily {
    /// Midnight UTC of the forecast day.
    pub date: DateTime<Utc>,
    pub day: Option<HalfDay>,
    pub night: Option<HalfDay>,
    pub sun: Option<Sun>,
    pub moon: Option<Moon>,
    pub uv: Option<Uv>,
    pub hours_of_sun: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hourly {
    pub date: DateTime<Utc>,
    pub is_daylight: Option<bool>,
    pub weather_code: Option<WeatherCode>,
    pub weather_text: Option<String>,
    pub temperature: Option<Temperature>,
    pub precipitation: Option<Precipitation>,
    pub precipitation_probability: Option<PrecipitationProbability>,
    pub wind: Option<Wind>,
    pub uv: Option<Uv>,
    pub relative_humidity: Option<f64>,
    pub dew_point: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub visibility_km: Option<f64>,
    pub air_quality: Option<AirQuality>,
    pub pollen: Option<Pollen>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub weather_code: Option<WeatherCode>,
    pub weather_text: Option<String>,
    pub is_daylight: Option<bool>,
    pub temperature: Option<Temperature>,
    pub wind: Option<Wind>,
    pub relative_humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub air_quality: Option<AirQuality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Extreme,
    Severe,
    Moderate,
    Minor,
    Unknown,
}

/// Severe weather alert as issued by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub source: Option<String>,
    pub severity: AlertSeverity,
}

/// One provider fetch, normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub refresh_time: Option<DateTime<Utc>>,
    pub current: Option<Current>,
    pub daily_forecast: Vec<Daily>,
    pub hourly_forecast: Vec<Hourly>,
    pub alerts: Vec<Alert>,
}

/// A saved place, with the last weather fetched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name, e.g. `Europe/London`.
    pub timezone: String,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub is_current_position: bool,
    pub forecast_source: ProviderId,
    #[serde(default)]
    pub weather: Option<Weather>,
}

impl Location {
    /// Display name, falling back through city and country.
    pub fn display_name(&self) -> &str {
        self.city
            .as_deref()
            .or(self.country.as_deref())
            .unwrap_or("Unknown location")
    }
}
