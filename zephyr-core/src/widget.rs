//! Home-screen widget data bridge.
//!
//! A separate timeline-rendering process reads a reduced weather snapshot
//! from shared storage; this module produces that snapshot and writes it as
//! JSON. Writes are last-write-wins and failures are logged, never
//! propagated to the user flow that triggered them.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};
use tracing::warn;

use crate::model::Location;
use crate::settings::{AppSettings, TemperatureUnit, project_dirs};

const WEATHER_DATA_FILE: &str = "weather_data.json";
const LOCATIONS_LIST_FILE: &str = "locations.json";

/// Days of daily forecast the widget timeline can show.
const WIDGET_DAILY_LIMIT: usize = 7;
/// Hours of hourly forecast the widget timeline can show.
const WIDGET_HOURLY_LIMIT: usize = 24;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetCurrent {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub weather_code: Option<&'static str>,
    pub weather_text: Option<String>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub is_daylight: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDay {
    /// ISO8601 UTC instant.
    pub date: String,
    pub day_temp: Option<f64>,
    pub night_temp: Option<f64>,
    pub day_weather_code: Option<&'static str>,
    pub night_weather_code: Option<&'static str>,
    pub day_weather_text: Option<String>,
    pub precip_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetHour {
    pub date: String,
    pub temperature: Option<f64>,
    pub weather_code: Option<&'static str>,
    pub precip_probability: Option<f64>,
    pub is_daylight: Option<bool>,
}

/// The reduced per-location snapshot the widget process renders from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub current: Option<WidgetCurrent>,
    pub daily: Vec<WidgetDay>,
    pub hourly: Vec<WidgetHour>,
    pub location_name: String,
    pub temperature_unit: String,
}

#[derive(Debug, Clone, Serialize)]
struct SharedLocation {
    id: String,
    name: String,
}

fn iso(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the reduced snapshot for one location. `None` when the location
/// has no weather yet.
pub fn snapshot(
    location: &Location,
    settings: &AppSettings,
    now: DateTime<Utc>,
) -> Option<WidgetSnapshot> {
    let weather = location.weather.as_ref()?;

    let current = weather.current.as_ref().map(|c| WidgetCurrent {
        temperature: c.temperature.and_then(|t| t.temperature),
        feels_like: c.temperature.and_then(|t| t.apparent),
        weather_code: c.weather_code.map(|code| code.widget_key()),
        weather_text: c.weather_text.clone(),
        humidity: c.relative_humidity,
        wind_speed: c.wind.and_then(|w| w.speed),
        is_daylight: c.is_daylight,
    });

    let today_start = now.date_naive().and_hms_opt(0, 0, 0).map(|d| d.and_utc());

    let daily = weather
        .daily_forecast
        .iter()
        .filter(|day| match today_start {
            Some(start) => day.date >= start,
            None => true,
        })
        .take(WIDGET_DAILY_LIMIT)
        .map(|day| WidgetDay {
            date: iso(day.date),
            day_temp: day
                .day
                .as_ref()
                .and_then(|h| h.temperature)
                .and_then(|t| t.temperature),
            night_temp: day
                .night
                .as_ref()
                .and_then(|h| h.temperature)
                .and_then(|t| t.temperature),
            day_weather_code: day
                .day
                .as_ref()
                .and_then(|h| h.weather_code)
                .map(|code| code.widget_key()),
            night_weather_code: day
                .night
                .as_ref()
                .and_then(|h| h.weather_code)
                .map(|code| code.widget_key()),
            day_weather_text: day.day.as_ref().and_then(|h| h.weather_text.clone()),
            precip_probability: day
                .day
                .as_ref()
                .and_then(|h| h.precipitation_probability)
                .and_then(|p| p.total),
        })
        .collect();

    let hourly = weather
        .hourly_forecast
        .iter()
        .filter(|hour| hour.date >= now)
        .take(WIDGET_HOURLY_LIMIT)
        .map(|hour| WidgetHour {
            date: iso(hour.date),
            temperature: hour.temperature.and_then(|t| t.temperature),
            weather_code: hour.weather_code.map(|code| code.widget_key()),
            precip_probability: hour.precipitation_probability.and_then(|p| p.total),
            is_daylight: hour.is_daylight,
        })
        .collect();

    Some(WidgetSnapshot {
        current,
        daily,
        hourly,
        location_name: location.display_name().to_string(),
        temperature_unit: match settings.temperature_unit {
            TemperatureUnit::Celsius => "celsius".to_string(),
            TemperatureUnit::Fahrenheit => "fahrenheit".to_string(),
        },
    })
}

/// Write the locations list and one snapshot per location into `dir`.
pub fn write_all_to(
    dir: &Path,
    locations: &[Location],
    settings: &AppSettings,
    now: DateTime<Utc>,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create widget directory: {}", dir.display()))?;

    let list: Vec<SharedLocation> = locations
        .iter()
        .map(|l| SharedLocation {
            id: l.id.clone(),
            name: l.display_name().to_string(),
        })
        .collect();

    let list_path = dir.join(LOCATIONS_LIST_FILE);
    let json = serde_json::to_string(&list).context("Failed to serialize widget locations")?;
    fs::write(&list_path, json)
        .with_context(|| format!("Failed to write {}", list_path.display()))?;

    let mut snapshots: BTreeMap<&str, WidgetSnapshot> = BTreeMap::new();
    for location in locations {
        if let Some(snap) = snapshot(location, settings, now) {
            snapshots.insert(location.id.as_str(), snap);
        }
    }

    if !snapshots.is_empty() {
        let data_path = dir.join(WEATHER_DATA_FILE);
        let json =
            serde_json::to_string(&snapshots).context("Failed to serialize widget snapshots")?;
        fs::write(&data_path, json)
            .with_context(|| format!("Failed to write {}", data_path.display()))?;
    }

    Ok(())
}

/// Shared directory the widget process reads from.
pub fn widget_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("widgets"))
}

/// Mirror all locations into the shared widget storage. Errors are logged
/// and swallowed; a widget that lags behind is not worth failing a refresh.
pub fn update_widgets(locations: &[Location], settings: &AppSettings) {
    let result =
        widget_dir().and_then(|dir| write_all_to(&dir, locations, settings, Utc::now()));

    if let Err(err) = result {
        warn!("Failed to update widget data: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Current, Daily, HalfDay, Hourly, Precipitation, PrecipitationProbability, Temperature,
        Weather, WeatherCode, Wind,
    };
    use crate::provider::ProviderId;
    use chrono::TimeZone;

    fn day(date: DateTime<Utc>, temp: f64) -> Daily {
        Daily {
            date,
            day: Some(HalfDay {
                weather_code: Some(WeatherCode::PartlyCloudy),
                weather_text: Some("Partly cloudy".into()),
                temperature: Some(Temperature {
                    temperature: Some(temp),
                    apparent: None,
                }),
                precipitation: Some(Precipitation::default()),
                precipitation_probability: Some(PrecipitationProbability {
                    total: Some(20.0),
                }),
                wind: Some(Wind::default()),
            }),
            night: None,
            ..Daily::default()
        }
    }

    fn hour(date: DateTime<Utc>, temp: f64) -> Hourly {
        Hourly {
            date,
            temperature: Some(Temperature {
                temperature: Some(temp),
                apparent: None,
            }),
            weather_code: Some(WeatherCode::Rain),
            ..Hourly::default()
        }
    }

    fn location_with_weather(now: DateTime<Utc>) -> Location {
        let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let daily = (0..10)
            .map(|i| day(midnight - chrono::Duration::days(2) + chrono::Duration::days(i), 20.0))
            .collect();
        let hourly = (0..30)
            .map(|i| hour(now - chrono::Duration::hours(3) + chrono::Duration::hours(i), 15.0))
            .collect();

        Location {
            id: "loc-1".into(),
            latitude: 51.5074,
            longitude: -0.1278,
            timezone: "Europe/London".into(),
            country: Some("United Kingdom".into()),
            province: None,
            city: Some("London".into()),
            is_current_position: false,
            forecast_source: ProviderId::OpenMeteo,
            weather: Some(Weather {
                refresh_time: Some(now),
                current: Some(Current {
                    weather_code: Some(WeatherCode::Clear),
                    weather_text: Some("Clear sky".into()),
                    is_daylight: Some(true),
                    temperature: Some(Temperature {
                        temperature: Some(21.5),
                        apparent: Some(20.0),
                    }),
                    wind: Some(Wind {
                        speed: Some(12.0),
                        direction: Some(90.0),
                        gusts: None,
                    }),
                    relative_humidity: Some(40.0),
                    ..Current::default()
                }),
                daily_forecast: daily,
                hourly_forecast: hourly,
                alerts: vec![],
            }),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn snapshot_requires_weather() {
        let mut loc = location_with_weather(noon());
        loc.weather = None;
        assert!(snapshot(&loc, &AppSettings::default(), noon()).is_none());
    }

    #[test]
    fn snapshot_trims_past_days_and_caps_counts() {
        let now = noon();
        let loc = location_with_weather(now);
        let snap = snapshot(&loc, &AppSettings::default(), now).unwrap();

        assert_eq!(snap.daily.len(), WIDGET_DAILY_LIMIT);
        assert_eq!(snap.hourly.len(), WIDGET_HOURLY_LIMIT);

        // nothing from before today / before now survives the trim
        let today = "2024-06-21T00:00:00.000Z";
        assert_eq!(snap.daily[0].date, today);
        assert_eq!(snap.hourly[0].date, "2024-06-21T12:00:00.000Z");
    }

    #[test]
    fn snapshot_lowercases_weather_codes() {
        let now = noon();
        let loc = location_with_weather(now);
        let snap = snapshot(&loc, &AppSettings::default(), now).unwrap();

        assert_eq!(snap.current.as_ref().unwrap().weather_code, Some("clear"));
        assert_eq!(snap.daily[0].day_weather_code, Some("partly_cloudy"));
        assert_eq!(snap.hourly[0].weather_code, Some("rain"));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let now = noon();
        let loc = location_with_weather(now);
        let snap = snapshot(&loc, &AppSettings::default(), now).unwrap();
        let json = serde_json::to_string(&snap).unwrap();

        assert!(json.contains("\"feelsLike\""));
        assert!(json.contains("\"locationName\":\"London\""));
        assert!(json.contains("\"temperatureUnit\":\"fahrenheit\""));
    }

    #[test]
    fn write_all_produces_both_files() {
        let now = noon();
        let dir = tempfile::tempdir().unwrap();
        let loc = location_with_weather(now);

        write_all_to(dir.path(), &[loc], &AppSettings::default(), now).unwrap();

        let list: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(LOCATIONS_LIST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(list[0]["id"], "loc-1");
        assert_eq!(list[0]["name"], "London");

        let data: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(WEATHER_DATA_FILE)).unwrap(),
        )
        .unwrap();
        assert!(data["loc-1"]["current"]["temperature"].is_number());
    }

    #[test]
    fn write_all_without_weather_skips_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut loc = location_with_weather(noon());
        loc.weather = None;

        write_all_to(dir.path(), &[loc], &AppSettings::default(), noon()).unwrap();

        assert!(dir.path().join(LOCATIONS_LIST_FILE).exists());
        assert!(!dir.path().join(WEATHER_DATA_FILE).exists());
    }
}
