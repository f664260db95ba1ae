//! US National Weather Service adapter.
//!
//! NWS splits a forecast across several endpoints: a `points` lookup
//! resolves coordinates to grid URLs, which are then fetched concurrently.
//! Day and night arrive as separate half-day periods that get grouped back
//! into calendar days here. Temperatures come in Fahrenheit and wind as
//! prose ("7 to 15 mph"), so normalization does real work for this one.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use super::{ProviderError, ProviderId, WeatherProvider, truncate_body};
use crate::model::{
    Alert, AlertSeverity, Current, Daily, HalfDay, Hourly, Location, Moon,
    PrecipitationProbability, Sun, Temperature, Weather, WeatherCode, Wind,
};
use crate::sun;

const NWS_API_BASE_URL: &str = "https://api.weather.gov";
const USER_AGENT: &str = "ZephyrWeather/1.0 (zephyrweather.app, support@zephyrweather.app)";

#[derive(Debug, Clone)]
pub struct NwsProvider {
    http: Client,
}

impl Default for NwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    properties: PointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointProperties {
    forecast: String,
    forecast_hourly: String,
    forecast_grid_data: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    start_time: DateTime<FixedOffset>,
    is_daytime: bool,
    temperature: f64,
    temperature_unit: String,
    wind_speed: Option<String>,
    wind_direction: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    short_forecast: String,
    probability_of_precipitation: Option<MeasuredValue>,
}

#[derive(Debug, Deserialize)]
struct MeasuredValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GridDataResponse {
    properties: GridDataProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridDataProperties {
    relative_humidity: Option<GridSeries>,
}

#[derive(Debug, Deserialize)]
struct GridSeries {
    values: Vec<MeasuredValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertsResponse {
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    id: String,
    properties: AlertProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    headline: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
    severity: Option<String>,
    onset: Option<String>,
    expires: Option<String>,
    sender_name: Option<String>,
}

impl NwsProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// True when NWS has a forecast grid for these coordinates, i.e. the
    /// location is in the United States.
    pub async fn covers(&self, latitude: f64, longitude: f64) -> bool {
        self.fetch_point(latitude, longitude).await.is_ok()
    }

    async fn fetch_point(&self, latitude: f64, longitude: f64) -> Result<PointProperties> {
        let url = format!("{NWS_API_BASE_URL}/points/{latitude:.4},{longitude:.4}");

        let res = self
            .request(&url)
            .send()
            .await
            .context("Failed to send request to NWS (points)")?;

        if res.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::OutsideCoverage {
                provider: ProviderId::Nws,
                latitude,
                longitude,
            }
            .into());
        }

        let parsed: PointResponse = Self::decode(res, "points").await?;
        Ok(parsed.properties)
    }

    async fn fetch_alerts(&self, latitude: f64, longitude: f64) -> Result<AlertsResponse> {
        let url = format!("{NWS_API_BASE_URL}/alerts/active?point={latitude},{longitude}");

        let res = self
            .request(&url)
            .send()
            .await
            .context("Failed to send request to NWS (alerts)")?;

        Self::decode(res, "alerts").await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let res = self
            .request(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to NWS ({what})"))?;

        Self::decode(res, what).await
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/geo+json")
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response, what: &str) -> Result<T> {
        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read NWS {what} response body"))?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: ProviderId::Nws,
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse NWS {what} JSON"))
    }
}

#[async_trait]
impl WeatherProvider for NwsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Nws
    }

    async fn fetch_weather(&self, location: &Location) -> Result<Weather> {
        let point = self.fetch_point(location.latitude, location.longitude).await?;

        // fan out over the grid endpoints, join before normalizing
        let (forecast, hourly, grid, alerts) = tokio::join!(
            self.get_json::<ForecastResponse>(&point.forecast, "forecast"),
            self.get_json::<ForecastResponse>(&point.forecast_hourly, "hourly forecast"),
            self.get_json::<GridDataResponse>(&point.forecast_grid_data, "grid data"),
            self.fetch_alerts(location.latitude, location.longitude),
        );

        let forecast = forecast?;
        let hourly = hourly?;
        // humidity and alerts are nice-to-have; the forecast is not
        let grid = grid.ok();
        let alerts = alerts.unwrap_or_default();

        Ok(normalize(
            forecast,
            hourly,
            grid,
            alerts,
            location.latitude,
            location.longitude,
        ))
    }
}

fn normalize(
    forecast: ForecastResponse,
    hourly: ForecastResponse,
    grid: Option<GridDataResponse>,
    alerts: AlertsResponse,
    latitude: f64,
    longitude: f64,
) -> Weather {
    let hourly_periods = hourly.properties.periods;

    let current_humidity = grid
        .as_ref()
        .and_then(|g| g.properties.relative_humidity.as_ref())
        .and_then(|rh| rh.values.first())
        .and_then(|v| v.value);

    let current = hourly_periods.first().map(|period| Current {
        weather_code: Some(classify_forecast(
            &period.short_forecast,
            period.icon.as_deref().unwrap_or(""),
        )),
        weather_text: Some(period.short_forecast.clone()),
        is_daylight: Some(period.is_daytime),
        temperature: Some(Temperature {
            temperature: Some(to_celsius(period.temperature, &period.temperature_unit)),
            apparent: None,
        }),
        wind: Some(wind_from_period(period)),
        relative_humidity: current_humidity,
        ..Current::default()
    });

    let daily_forecast = build_daily(&forecast.properties.periods, latitude, longitude);

    let hourly_forecast = hourly_periods
        .iter()
        .map(|period| Hourly {
            date: period.start_time.with_timezone(&Utc),
            is_daylight: Some(period.is_daytime),
            weather_code: Some(classify_forecast(
                &period.short_forecast,
                period.icon.as_deref().unwrap_or(""),
            )),
            weather_text: Some(period.short_forecast.clone()),
            temperature: Some(Temperature {
                temperature: Some(to_celsius(period.temperature, &period.temperature_unit)),
                apparent: None,
            }),
            wind: Some(wind_from_period(period)),
            precipitation_probability: Some(PrecipitationProbability {
                total: period
                    .probability_of_precipitation
                    .as_ref()
                    .and_then(|p| p.value),
            }),
            ..Hourly::default()
        })
        .collect();

    let alerts = alerts
        .features
        .into_iter()
        .map(|feature| {
            let props = feature.properties;
            Alert {
                id: feature.id,
                start_date: parse_instant(props.onset.as_deref()),
                end_date: parse_instant(props.expires.as_deref()),
                headline: props.headline,
                description: props.description,
                instruction: props.instruction,
                source: props.sender_name,
                severity: classify_severity(props.severity.as_deref()),
            }
        })
        .collect();

    Weather {
        refresh_time: Some(Utc::now()),
        current,
        daily_forecast,
        hourly_forecast,
        alerts,
    }
}

/// Group half-day periods into calendar days, keyed by the period's UTC
/// date. The ephemeris fields are filled in once per day, when the day's
/// entry is first created.
fn build_daily(periods: &[ForecastPeriod], latitude: f64, longitude: f64) -> Vec<Daily> {
    let mut days: BTreeMap<NaiveDate, Daily> = BTreeMap::new();

    for period in periods {
        let date_key = period.start_time.with_timezone(&Utc).date_naive();

        let entry = days
            .entry(date_key)
            .or_insert_with(|| new_day(date_key, latitude, longitude));

        let half = HalfDay {
            weather_code: Some(classify_forecast(
                &period.short_forecast,
                period.icon.as_deref().unwrap_or(""),
            )),
            weather_text: Some(period.short_forecast.clone()),
            temperature: Some(Temperature {
                temperature: Some(to_celsius(period.temperature, &period.temperature_unit)),
                apparent: None,
            }),
            precipitation: None,
            precipitation_probability: Some(PrecipitationProbability {
                total: period
                    .probability_of_precipitation
                    .as_ref()
                    .and_then(|p| p.value),
            }),
            wind: Some(wind_from_period(period)),
        };

        if period.is_daytime {
            entry.day = Some(half);
        } else {
            entry.night = Some(half);
        }
    }

    days.into_values().collect()
}

fn new_day(date: NaiveDate, latitude: f64, longitude: f64) -> Daily {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    let times = sun::sun_times(midnight, latitude, longitude, 0.0);
    let daylight = sun::daylight_duration_hours(midnight, latitude, longitude);

    Daily {
        date: midnight,
        sun: Some(Sun {
            rise_time: times.sunrise,
            set_time: times.sunset,
        }),
        moon: Some(Moon {
            phase: Some(sun::moon_phase(midnight)),
        }),
        hours_of_sun: daylight.is_finite().then_some(daylight),
        ..Daily::default()
    }
}

fn wind_from_period(period: &ForecastPeriod) -> Wind {
    Wind {
        speed: period
            .wind_speed
            .as_deref()
            .map(|text| mph_to_kmh(parse_wind_speed(text))),
        direction: period.wind_direction.as_deref().map(parse_wind_direction),
        gusts: None,
    }
}

/// Map the NWS prose forecast (and icon URL) onto the shared condition
/// taxonomy. Order matters: precipitation phrases outrank sky cover.
fn classify_forecast(short_forecast: &str, icon: &str) -> WeatherCode {
    let forecast = short_forecast.to_lowercase();
    let icon_url = icon.to_lowercase();

    if forecast.contains("thunder") || forecast.contains("tstorm") {
        return WeatherCode::Thunderstorm;
    }

    if forecast.contains("snow") {
        if forecast.contains("heavy") {
            return WeatherCode::SnowHeavy;
        }
        if forecast.contains("light") {
            return WeatherCode::SnowLight;
        }
        return WeatherCode::Snow;
    }

    if forecast.contains("sleet")
        || forecast.contains("freezing rain")
        || forecast.contains("ice")
    {
        return WeatherCode::Sleet;
    }

    if forecast.contains("rain") || forecast.contains("shower") || forecast.contains("drizzle") {
        if forecast.contains("heavy") {
            return WeatherCode::RainHeavy;
        }
        if forecast.contains("light") {
            return WeatherCode::RainLight;
        }
        return WeatherCode::Rain;
    }

    if forecast.contains("fog") {
        return WeatherCode::Fog;
    }

    if forecast.contains("haze") {
        return WeatherCode::Haze;
    }

    if forecast.contains("clear")
        || forecast.contains("sunny")
        || icon_url.contains("skc")
        || icon_url.contains("few")
    {
        return WeatherCode::Clear;
    }

    if forecast.contains("partly") || forecast.contains("scattered") || icon_url.contains("sct") {
        return WeatherCode::PartlyCloudy;
    }

    if forecast.contains("cloudy")
        || forecast.contains("overcast")
        || icon_url.contains("bkn")
        || icon_url.contains("ovc")
    {
        return WeatherCode::Cloudy;
    }

    WeatherCode::Clear
}

fn classify_severity(severity: Option<&str>) -> AlertSeverity {
    match severity.map(str::to_lowercase).as_deref() {
        Some("extreme") => AlertSeverity::Extreme,
        Some("severe") => AlertSeverity::Severe,
        Some("moderate") => AlertSeverity::Moderate,
        Some("minor") => AlertSeverity::Minor,
        _ => AlertSeverity::Unknown,
    }
}

/// Average of the bounds in the NWS wind phrasing, e.g. "13 mph" or
/// "7 to 15 mph". Anything without a number ("Calm") is zero.
fn parse_wind_speed(text: &str) -> f64 {
    let numbers: Vec<f64> = text
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .collect();

    match (numbers.first(), numbers.last()) {
        (Some(min), Some(max)) => (min + max) / 2.0,
        _ => 0.0,
    }
}

const CARDINAL_DIRECTIONS: &[(&str, f64)] = &[
    ("N", 0.0),
    ("NNE", 22.5),
    ("NE", 45.0),
    ("ENE", 67.5),
    ("E", 90.0),
    ("ESE", 112.5),
    ("SE", 135.0),
    ("SSE", 157.5),
    ("S", 180.0),
    ("SSW", 202.5),
    ("SW", 225.0),
    ("WSW", 247.5),
    ("W", 270.0),
    ("WNW", 292.5),
    ("NW", 315.0),
    ("NNW", 337.5),
];

fn parse_wind_direction(text: &str) -> f64 {
    let upper = text.trim().to_uppercase();
    CARDINAL_DIRECTIONS
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, degrees)| *degrees)
        .unwrap_or(0.0)
}

fn to_celsius(value: f64, unit: &str) -> f64 {
    if unit.eq_ignore_ascii_case("f") {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    }
}

fn mph_to_kmh(mph: f64) -> f64 {
    mph * 1.609_34
}

fn parse_instant(text: Option<&str>) -> Option<DateTime<Utc>> {
    text.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_speed_single_value() {
        assert_eq!(parse_wind_speed("13 mph"), 13.0);
    }

    #[test]
    fn wind_speed_range_averages() {
        assert_eq!(parse_wind_speed("7 to 15 mph"), 11.0);
    }

    #[test]
    fn wind_speed_without_numbers_is_zero() {
        assert_eq!(parse_wind_speed("Calm"), 0.0);
        assert_eq!(parse_wind_speed(""), 0.0);
    }

    #[test]
    fn wind_direction_cardinals() {
        assert_eq!(parse_wind_direction("N"), 0.0);
        assert_eq!(parse_wind_direction("NW"), 315.0);
        assert_eq!(parse_wind_direction("sse"), 157.5);
        assert_eq!(parse_wind_direction("VAR"), 0.0);
    }

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(to_celsius(32.0, "F"), 0.0);
        assert_eq!(to_celsius(212.0, "F"), 100.0);
        assert_eq!(to_celsius(20.0, "C"), 20.0);
    }

    #[test]
    fn forecast_classification() {
        assert_eq!(classify_forecast("Sunny", ""), WeatherCode::Clear);
        assert_eq!(classify_forecast("Mostly Cloudy", ""), WeatherCode::Cloudy);
        assert_eq!(
            classify_forecast("Partly Sunny then Scattered Showers", ""),
            WeatherCode::Rain
        );
        assert_eq!(
            classify_forecast("Scattered Thunderstorms", ""),
            WeatherCode::Thunderstorm
        );
        assert_eq!(classify_forecast("Heavy Snow", ""), WeatherCode::SnowHeavy);
        assert_eq!(classify_forecast("Light Rain", ""), WeatherCode::RainLight);
        assert_eq!(classify_forecast("Freezing Rain", ""), WeatherCode::Sleet);
        assert_eq!(classify_forecast("Patchy Fog", ""), WeatherCode::Fog);
        // sky cover can come from the icon when the text is uninformative
        assert_eq!(
            classify_forecast("", "https://api.weather.gov/icons/land/day/sct?size=medium"),
            WeatherCode::PartlyCloudy
        );
    }

    #[test]
    fn severity_classification() {
        assert_eq!(classify_severity(Some("Extreme")), AlertSeverity::Extreme);
        assert_eq!(classify_severity(Some("minor")), AlertSeverity::Minor);
        assert_eq!(classify_severity(Some("odd")), AlertSeverity::Unknown);
        assert_eq!(classify_severity(None), AlertSeverity::Unknown);
    }

    const DAILY_SAMPLE: &str = r#"{
        "properties": {
            "periods": [
                {
                    "number": 1,
                    "name": "Friday",
                    "startTime": "2024-06-21T06:00:00-04:00",
                    "endTime": "2024-06-21T18:00:00-04:00",
                    "isDaytime": true,
                    "temperature": 84,
                    "temperatureUnit": "F",
                    "windSpeed": "5 to 10 mph",
                    "windDirection": "SW",
                    "icon": "https://api.weather.gov/icons/land/day/sct?size=medium",
                    "shortForecast": "Partly Cloudy",
                    "probabilityOfPrecipitation": {"value": 20}
                },
                {
                    "number": 2,
                    "name": "Friday Night",
                    "startTime": "2024-06-21T18:00:00-04:00",
                    "endTime": "2024-06-22T06:00:00-04:00",
                    "isDaytime": false,
                    "temperature": 66,
                    "temperatureUnit": "F",
                    "windSpeed": "5 mph",
                    "windDirection": "S",
                    "icon": "https://api.weather.gov/icons/land/night/few?size=medium",
                    "shortForecast": "Mostly Clear",
                    "probabilityOfPrecipitation": {"value": null}
                }
            ]
        }
    }"#;

    #[test]
    fn day_and_night_periods_group_into_one_day() {
        let parsed: ForecastResponse = serde_json::from_str(DAILY_SAMPLE).unwrap();
        let days = build_daily(&parsed.properties.periods, 40.7128, -74.006);

        // the daytime period starts at 06:00-04:00 = 10:00Z on the 21st;
        // the night period starts at 22:00Z the same UTC day
        assert_eq!(days.len(), 1);
        let first = &days[0];
        assert_eq!(first.date.to_rfc3339(), "2024-06-21T00:00:00+00:00");
        assert!(first.day.is_some());
        assert!(first.night.is_some());

        let day = first.day.as_ref().unwrap();
        assert_eq!(day.weather_code, Some(WeatherCode::PartlyCloudy));
        let temp = day.temperature.unwrap().temperature.unwrap();
        assert!((temp - 28.888).abs() < 0.01);
        let wind = day.wind.unwrap();
        assert!((wind.speed.unwrap() - 7.5 * 1.609_34).abs() < 1e-9);
        assert_eq!(wind.direction, Some(225.0));

        // ephemeris fields are filled in per day
        assert!(first.sun.unwrap().rise_time.is_some());
        assert!(first.hours_of_sun.unwrap() > 12.0);
        assert!(first.moon.unwrap().phase.is_some());
    }

    #[test]
    fn normalize_builds_current_from_first_hourly_period() {
        let forecast: ForecastResponse = serde_json::from_str(DAILY_SAMPLE).unwrap();
        let hourly: ForecastResponse = serde_json::from_str(DAILY_SAMPLE).unwrap();

        let weather = normalize(
            forecast,
            hourly,
            None,
            AlertsResponse::default(),
            40.7128,
            -74.006,
        );

        let current = weather.current.unwrap();
        assert_eq!(current.weather_code, Some(WeatherCode::PartlyCloudy));
        assert_eq!(current.is_daylight, Some(true));
        assert!(current.relative_humidity.is_none());
        assert_eq!(weather.hourly_forecast.len(), 2);
        assert!(weather.alerts.is_empty());
    }
}
