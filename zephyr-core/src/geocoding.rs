//! Location search against the Open-Meteo geocoding API.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::model::Location;
use crate::provider::ProviderId;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodedPlace>>,
}

/// One geocoder hit, as returned upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    /// First-level administrative division, e.g. a state or province.
    pub admin1: Option<String>,
    pub timezone: Option<String>,
}

impl GeocodedPlace {
    /// Label shown when asking the user to pick between several hits.
    pub fn label(&self) -> String {
        match (&self.admin1, &self.country) {
            (Some(admin), Some(country)) => format!("{}, {}, {}", self.name, admin, country),
            (None, Some(country)) => format!("{}, {}", self.name, country),
            _ => self.name.clone(),
        }
    }

    /// Turn the hit into a saved location with a fresh id.
    pub fn into_location(self, forecast_source: ProviderId) -> Location {
        Location {
            id: Uuid::new_v4().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self.timezone.unwrap_or_else(|| "UTC".to_string()),
            country: self.country,
            province: self.admin1,
            city: Some(self.name),
            is_current_position: false,
            forecast_source,
            weather: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: Client,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// Search for places by name. Returns up to ten hits, best first.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodedPlace>> {
        let res = self
            .http
            .get(GEOCODING_URL)
            .query(&[
                ("name", query),
                ("count", "10"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to send request to the geocoding service")?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("Geocoding request failed with status {status}"));
        }

        let parsed: GeocodingResponse = res
            .json()
            .await
            .context("Failed to parse geocoding JSON")?;

        Ok(parsed.results.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "results": [
            {
                "id": 2643743,
                "name": "London",
                "latitude": 51.50853,
                "longitude": -0.12574,
                "country": "United Kingdom",
                "country_code": "GB",
                "admin1": "England",
                "timezone": "Europe/London"
            },
            {
                "id": 6058560,
                "name": "London",
                "latitude": 42.98339,
                "longitude": -81.23304,
                "country": "Canada",
                "timezone": "America/Toronto"
            }
        ]
    }"#;

    #[test]
    fn parses_geocoding_payload() {
        let parsed: GeocodingResponse = serde_json::from_str(SAMPLE).unwrap();
        let results = parsed.results.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "London");
        assert_eq!(results[0].label(), "London, England, United Kingdom");
        assert_eq!(results[1].label(), "London, Canada");
    }

    #[test]
    fn empty_payload_means_no_results() {
        let parsed: GeocodingResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_none());
    }

    #[test]
    fn into_location_carries_the_place_over() {
        let parsed: GeocodingResponse = serde_json::from_str(SAMPLE).unwrap();
        let place = parsed.results.unwrap().remove(0);
        let location = place.into_location(ProviderId::OpenMeteo);

        assert_eq!(location.city.as_deref(), Some("London"));
        assert_eq!(location.timezone, "Europe/London");
        assert_eq!(location.forecast_source, ProviderId::OpenMeteo);
        assert!(!location.id.is_empty());
        assert!(!location.is_current_position);
    }
}
