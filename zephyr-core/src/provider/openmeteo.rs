//! Open-Meteo adapter.
//!
//! One forecast request and one air-quality request, joined, then zipped
//! together by timestamp. Open-Meteo already serves metric values, so
//! normalization here is mostly reshaping columnar arrays into per-instant
//! records and mapping WMO codes onto the shared taxonomy.
//!
//! All timestamps are requested in UTC; sunrise/sunset columns are not
//! requested at all because the ephemeris module is the single source of
//! truth for sun data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ProviderError, ProviderId, WeatherProvider, truncate_body};
use crate::model::{
    AirQuality, Current, Daily, HalfDay, Hourly, Location, Moon, Pollen, Precipitation,
    PrecipitationProbability, Sun, Temperature, Uv, Weather, WeatherCode, Wind,
};
use crate::sun;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,is_day,\
                              weather_code,cloud_cover,pressure_msl,wind_speed_10m,\
                              wind_direction_10m,wind_gusts_10m";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,dew_point_2m,\
                             apparent_temperature,precipitation_probability,precipitation,rain,\
                             snowfall,weather_code,pressure_msl,cloud_cover,visibility,\
                             wind_speed_10m,wind_direction_10m,wind_gusts_10m,uv_index,is_day";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
                            apparent_temperature_max,apparent_temperature_min,uv_index_max,\
                            precipitation_sum,rain_sum,snowfall_sum,\
                            precipitation_probability_max,wind_speed_10m_max,\
                            wind_gusts_10m_max,wind_direction_10m_dominant";
const AQ_CURRENT_FIELDS: &str =
    "pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,ozone,european_aqi,us_aqi";
const AQ_HOURLY_FIELDS: &str = "pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,\
                                ozone,european_aqi,us_aqi,grass_pollen,birch_pollen,\
                                ragweed_pollen,olive_pollen";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Columnar series as Open-Meteo serves them; entries can be null.
type Series = Option<Vec<Option<f64>>>;

fn at(series: &Series, index: usize) -> Option<f64> {
    series.as_ref().and_then(|s| s.get(index)).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
    hourly: Option<HourlyBlock>,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    is_day: Option<f64>,
    weather_code: Option<f64>,
    cloud_cover: Option<f64>,
    pressure_msl: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    wind_gusts_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Series,
    #[serde(default)]
    relative_humidity_2m: Series,
    #[serde(default)]
    dew_point_2m: Series,
    #[serde(default)]
    apparent_temperature: Series,
    #[serde(default)]
    precipitation_probability: Series,
    #[serde(default)]
    precipitation: Series,
    #[serde(default)]
    rain: Series,
    #[serde(default)]
    snowfall: Series,
    #[serde(default)]
    weather_code: Series,
    #[serde(default)]
    pressure_msl: Series,
    #[serde(default)]
    cloud_cover: Series,
    #[serde(default)]
    visibility: Series,
    #[serde(default)]
    wind_speed_10m: Series,
    #[serde(default)]
    wind_direction_10m: Series,
    #[serde(default)]
    wind_gusts_10m: Series,
    #[serde(default)]
    uv_index: Series,
    #[serde(default)]
    is_day: Series,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(default)]
    weather_code: Series,
    #[serde(default)]
    temperature_2m_max: Series,
    #[serde(default)]
    temperature_2m_min: Series,
    #[serde(default)]
    apparent_temperature_max: Series,
    #[serde(default)]
    apparent_temperature_min: Series,
    #[serde(default)]
    uv_index_max: Series,
    #[serde(default)]
    precipitation_sum: Series,
    #[serde(default)]
    rain_sum: Series,
    #[serde(default)]
    snowfall_sum: Series,
    #[serde(default)]
    precipitation_probability_max: Series,
    #[serde(default)]
    wind_speed_10m_max: Series,
    #[serde(default)]
    wind_gusts_10m_max: Series,
    #[serde(default)]
    wind_direction_10m_dominant: Series,
}

#[derive(Debug, Default, Deserialize)]
struct AirQualityResponse {
    current: Option<AqCurrentBlock>,
    hourly: Option<AqHourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct AqCurrentBlock {
    pm10: Option<f64>,
    pm2_5: Option<f64>,
    carbon_monoxide: Option<f64>,
    nitrogen_dioxide: Option<f64>,
    sulphur_dioxide: Option<f64>,
    ozone: Option<f64>,
    european_aqi: Option<f64>,
    us_aqi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AqHourlyBlock {
    time: Vec<String>,
    #[serde(default)]
    pm10: Series,
    #[serde(default)]
    pm2_5: Series,
    #[serde(default)]
    carbon_monoxide: Series,
    #[serde(default)]
    nitrogen_dioxide: Series,
    #[serde(default)]
    sulphur_dioxide: Series,
    #[serde(default)]
    ozone: Series,
    #[serde(default)]
    european_aqi: Series,
    #[serde(default)]
    us_aqi: Series,
    #[serde(default)]
    grass_pollen: Series,
    #[serde(default)]
    birch_pollen: Series,
    #[serde(default)]
    ragweed_pollen: Series,
    #[serde(default)]
    olive_pollen: Series,
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse> {
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("timezone", "UTC".to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("forecast_days", "16".to_string()),
            ("past_days", "1".to_string()),
        ];

        self.get_json(FORECAST_URL, &query, "forecast").await
    }

    async fn fetch_air_quality(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AirQualityResponse> {
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("timezone", "UTC".to_string()),
            ("current", AQ_CURRENT_FIELDS.to_string()),
            ("hourly", AQ_HOURLY_FIELDS.to_string()),
        ];

        self.get_json(AIR_QUALITY_URL, &query, "air quality").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Open-Meteo ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Open-Meteo {what} response body"))?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: ProviderId::OpenMeteo,
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Open-Meteo {what} JSON"))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch_weather(&self, location: &Location) -> Result<Weather> {
        // fan out, join, then normalize
        let (forecast, air_quality) = tokio::join!(
            self.fetch_forecast(location.latitude, location.longitude),
            self.fetch_air_quality(location.latitude, location.longitude),
        );

        Ok(normalize(
            forecast?,
            air_quality?,
            location.latitude,
            location.longitude,
        ))
    }
}

fn normalize(
    forecast: ForecastResponse,
    air_quality: AirQualityResponse,
    latitude: f64,
    longitude: f64,
) -> Weather {
    let current = forecast.current.map(|block| {
        let code = block.weather_code.map(|c| map_wmo_code(c as i64));
        Current {
            weather_code: code,
            weather_text: code.map(|c| c.description().to_string()),
            is_daylight: block.is_day.map(|v| v == 1.0),
            temperature: Some(Temperature {
                temperature: block.temperature_2m,
                apparent: block.apparent_temperature,
            }),
            wind: Some(Wind {
                speed: block.wind_speed_10m,
                direction: block.wind_direction_10m,
                gusts: block.wind_gusts_10m,
            }),
            relative_humidity: block.relative_humidity_2m,
            pressure: block.pressure_msl,
            cloud_cover: block.cloud_cover,
            air_quality: air_quality.current.as_ref().map(|aq| AirQuality {
                pm25: aq.pm2_5,
                pm10: aq.pm10,
                o3: aq.ozone,
                no2: aq.nitrogen_dioxide,
                so2: aq.sulphur_dioxide,
                co: aq.carbon_monoxide,
                aqi: aq.us_aqi.or(aq.european_aqi),
            }),
        }
    });

    let daily_forecast = forecast
        .daily
        .map(|block| build_daily(&block, latitude, longitude))
        .unwrap_or_default();

    let hourly_forecast = forecast
        .hourly
        .map(|block| build_hourly(&block, air_quality.hourly.as_ref()))
        .unwrap_or_default();

    Weather {
        refresh_time: Some(Utc::now()),
        current,
        daily_forecast,
        hourly_forecast,
        alerts: vec![],
    }
}

fn build_daily(block: &DailyBlock, latitude: f64, longitude: f64) -> Vec<Daily> {
    block
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let Ok(date) = NaiveDate::parse_from_str(time, "%Y-%m-%d") else {
                debug!("Skipping daily entry with unparseable date: {time}");
                return None;
            };
            let midnight = date.and_time(NaiveTime::MIN).and_utc();

            let code = at(&block.weather_code, i).map(|c| map_wmo_code(c as i64));
            let times = sun::sun_times(midnight, latitude, longitude, 0.0);
            let daylight = sun::daylight_duration_hours(midnight, latitude, longitude);

            Some(Daily {
                date: midnight,
                day: Some(HalfDay {
                    weather_code: code,
                    weather_text: code.map(|c| c.description().to_string()),
                    temperature: Some(Temperature {
                        temperature: at(&block.temperature_2m_max, i),
                        apparent: at(&block.apparent_temperature_max, i),
                    }),
                    precipitation: Some(Precipitation {
                        total: at(&block.precipitation_sum, i),
                        rain: at(&block.rain_sum, i),
                        snow: at(&block.snowfall_sum, i),
                    }),
                    precipitation_probability: Some(PrecipitationProbability {
                        total: at(&block.precipitation_probability_max, i),
                    }),
                    wind: Some(Wind {
                        speed: at(&block.wind_speed_10m_max, i),
                        direction: at(&block.wind_direction_10m_dominant, i),
                        gusts: at(&block.wind_gusts_10m_max, i),
                    }),
                }),
                night: Some(HalfDay {
                    temperature: Some(Temperature {
                        temperature: at(&block.temperature_2m_min, i),
                        apparent: at(&block.apparent_temperature_min, i),
                    }),
                    ..HalfDay::default()
                }),
                sun: Some(Sun {
                    rise_time: times.sunrise,
                    set_time: times.sunset,
                }),
                moon: Some(Moon {
                    phase: Some(sun::moon_phase(midnight)),
                }),
                uv: Some(Uv {
                    index: at(&block.uv_index_max, i),
                }),
                hours_of_sun: daylight.is_finite().then_some(daylight),
            })
        })
        .collect()
}

fn build_hourly(block: &HourlyBlock, air_quality: Option<&AqHourlyBlock>) -> Vec<Hourly> {
    block
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let Ok(naive) = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M") else {
                debug!("Skipping hourly entry with unparseable time: {time}");
                return None;
            };
            let date = naive.and_utc();

            let code = at(&block.weather_code, i).map(|c| map_wmo_code(c as i64));

            // air-quality hours are a different series; join by timestamp
            let aq_index = air_quality.and_then(|aq| aq.time.iter().position(|t| t == time));

            let air = match (air_quality, aq_index) {
                (Some(aq), Some(j)) => Some(AirQuality {
                    pm25: at(&aq.pm2_5, j),
                    pm10: at(&aq.pm10, j),
                    o3: at(&aq.ozone, j),
                    no2: at(&aq.nitrogen_dioxide, j),
                    so2: at(&aq.sulphur_dioxide, j),
                    co: at(&aq.carbon_monoxide, j),
                    aqi: at(&aq.us_aqi, j).or_else(|| at(&aq.european_aqi, j)),
                }),
                _ => None,
            };

            let pollen = match (air_quality, aq_index) {
                (Some(aq), Some(j)) => Some(Pollen {
                    grass: at(&aq.grass_pollen, j),
                    ragweed: at(&aq.ragweed_pollen, j),
                    tree: Some(
                        at(&aq.birch_pollen, j).unwrap_or(0.0)
                            + at(&aq.olive_pollen, j).unwrap_or(0.0),
                    ),
                }),
                _ => None,
            };

            Some(Hourly {
                date,
                is_daylight: at(&block.is_day, i).map(|v| v == 1.0),
                weather_code: code,
                weather_text: code.map(|c| c.description().to_string()),
                temperature: Some(Temperature {
                    temperature: at(&block.temperature_2m, i),
                    apparent: at(&block.apparent_temperature, i),
                }),
                precipitation: Some(Precipitation {
                    total: at(&block.precipitation, i),
                    rain: at(&block.rain, i),
                    snow: at(&block.snowfall, i),
                }),
                precipitation_probability: Some(PrecipitationProbability {
                    total: at(&block.precipitation_probability, i),
                }),
                wind: Some(Wind {
                    speed: at(&block.wind_speed_10m, i),
                    direction: at(&block.wind_direction_10m, i),
                    gusts: at(&block.wind_gusts_10m, i),
                }),
                uv: Some(Uv {
                    index: at(&block.uv_index, i),
                }),
                relative_humidity: at(&block.relative_humidity_2m, i),
                dew_point: at(&block.dew_point_2m, i),
                pressure: at(&block.pressure_msl, i),
                cloud_cover: at(&block.cloud_cover, i),
                visibility_km: at(&block.visibility, i).map(|m| m / 1000.0),
                air_quality: air,
                pollen,
            })
        })
        .collect()
}

/// WMO weather interpretation codes onto the shared taxonomy.
fn map_wmo_code(code: i64) -> WeatherCode {
    match code {
        0 => WeatherCode::Clear,
        1 | 2 => WeatherCode::PartlyCloudy,
        3 => WeatherCode::Cloudy,
        45 | 48 => WeatherCode::Fog,
        51 | 53 | 56 => WeatherCode::RainLight,
        55 | 57 => WeatherCode::Rain,
        61 | 63 | 66 => WeatherCode::Rain,
        65 | 67 => WeatherCode::RainHeavy,
        71 | 73 | 77 => WeatherCode::SnowLight,
        75 => WeatherCode::Snow,
        85 | 86 => WeatherCode::SnowHeavy,
        80 | 81 | 82 => WeatherCode::Rain,
        95 | 96 | 99 => WeatherCode::Thunderstorm,
        _ => WeatherCode::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmo_code_mapping() {
        assert_eq!(map_wmo_code(0), WeatherCode::Clear);
        assert_eq!(map_wmo_code(2), WeatherCode::PartlyCloudy);
        assert_eq!(map_wmo_code(3), WeatherCode::Cloudy);
        assert_eq!(map_wmo_code(45), WeatherCode::Fog);
        assert_eq!(map_wmo_code(51), WeatherCode::RainLight);
        assert_eq!(map_wmo_code(65), WeatherCode::RainHeavy);
        assert_eq!(map_wmo_code(77), WeatherCode::SnowLight);
        assert_eq!(map_wmo_code(82), WeatherCode::Rain);
        assert_eq!(map_wmo_code(99), WeatherCode::Thunderstorm);
        // unknown codes fall back to clear
        assert_eq!(map_wmo_code(42), WeatherCode::Clear);
    }

    const FORECAST_SAMPLE: &str = r#"{
        "latitude": 51.5,
        "longitude": -0.12,
        "current": {
            "time": "2024-06-21T12:00",
            "temperature_2m": 21.4,
            "relative_humidity_2m": 52,
            "apparent_temperature": 20.9,
            "is_day": 1,
            "weather_code": 2,
            "cloud_cover": 40,
            "pressure_msl": 1016.2,
            "wind_speed_10m": 14.2,
            "wind_direction_10m": 230,
            "wind_gusts_10m": 28.1
        },
        "hourly": {
            "time": ["2024-06-21T12:00", "2024-06-21T13:00"],
            "temperature_2m": [21.4, 22.0],
            "precipitation_probability": [5, null],
            "weather_code": [2, 61],
            "visibility": [24140.0, 10000.0],
            "is_day": [1, 1]
        },
        "daily": {
            "time": ["2024-06-21", "2024-06-22"],
            "weather_code": [2, 61],
            "temperature_2m_max": [23.1, 19.4],
            "temperature_2m_min": [13.2, 12.1],
            "precipitation_probability_max": [10, 80],
            "uv_index_max": [6.4, 3.2]
        }
    }"#;

    const AIR_QUALITY_SAMPLE: &str = r#"{
        "current": {
            "time": "2024-06-21T12:00",
            "pm10": 12.0,
            "pm2_5": 7.5,
            "ozone": 61.0,
            "us_aqi": 42
        },
        "hourly": {
            "time": ["2024-06-21T13:00"],
            "pm2_5": [8.1],
            "grass_pollen": [14.0],
            "birch_pollen": [2.0],
            "olive_pollen": [null]
        }
    }"#;

    fn sample_weather() -> Weather {
        let forecast: ForecastResponse = serde_json::from_str(FORECAST_SAMPLE).unwrap();
        let air: AirQualityResponse = serde_json::from_str(AIR_QUALITY_SAMPLE).unwrap();
        normalize(forecast, air, 51.5074, -0.1278)
    }

    #[test]
    fn current_conditions_are_normalized() {
        let weather = sample_weather();
        let current = weather.current.unwrap();

        assert_eq!(current.weather_code, Some(WeatherCode::PartlyCloudy));
        assert_eq!(current.weather_text.as_deref(), Some("Partly cloudy"));
        assert_eq!(current.is_daylight, Some(true));
        assert_eq!(current.temperature.unwrap().temperature, Some(21.4));
        assert_eq!(current.wind.unwrap().gusts, Some(28.1));
        assert_eq!(current.air_quality.unwrap().aqi, Some(42.0));
    }

    #[test]
    fn hourly_zips_air_quality_by_timestamp() {
        let weather = sample_weather();
        assert_eq!(weather.hourly_forecast.len(), 2);

        // 12:00 has no matching air-quality hour
        let noon = &weather.hourly_forecast[0];
        assert_eq!(noon.date.to_rfc3339(), "2024-06-21T12:00:00+00:00");
        assert!(noon.air_quality.is_none());
        assert_eq!(noon.visibility_km, Some(24.14));
        assert_eq!(noon.precipitation_probability.unwrap().total, Some(5.0));

        // 13:00 does, including the combined tree pollen
        let one = &weather.hourly_forecast[1];
        assert_eq!(one.weather_code, Some(WeatherCode::Rain));
        assert_eq!(one.air_quality.unwrap().pm25, Some(8.1));
        let pollen = one.pollen.unwrap();
        assert_eq!(pollen.grass, Some(14.0));
        assert_eq!(pollen.tree, Some(2.0));
        // a null inside a series reads as absent
        assert!(one.precipitation_probability.unwrap().total.is_none());
    }

    #[test]
    fn daily_is_normalized_with_local_ephemeris() {
        let weather = sample_weather();
        assert_eq!(weather.daily_forecast.len(), 2);

        let first = &weather.daily_forecast[0];
        assert_eq!(first.date.to_rfc3339(), "2024-06-21T00:00:00+00:00");
        assert_eq!(
            first.day.as_ref().unwrap().weather_code,
            Some(WeatherCode::PartlyCloudy)
        );
        assert_eq!(
            first.day.as_ref().unwrap().temperature.unwrap().temperature,
            Some(23.1)
        );
        assert_eq!(
            first.night.as_ref().unwrap().temperature.unwrap().temperature,
            Some(13.2)
        );
        assert_eq!(first.uv.unwrap().index, Some(6.4));

        // sun data comes from the ephemeris, not the provider
        let sun = first.sun.unwrap();
        assert!(sun.rise_time.is_some());
        assert!(sun.set_time.is_some());
        let hours = first.hours_of_sun.unwrap();
        assert!((16.4..16.8).contains(&hours), "daylight was {hours}h");
    }

    #[test]
    fn missing_blocks_produce_empty_sections() {
        let forecast: ForecastResponse = serde_json::from_str("{}").unwrap();
        let weather = normalize(forecast, AirQualityResponse::default(), 0.0, 0.0);

        assert!(weather.current.is_none());
        assert!(weather.daily_forecast.is_empty());
        assert!(weather.hourly_forecast.is_empty());
        assert!(weather.alerts.is_empty());
    }
}
