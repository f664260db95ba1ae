//! Abstraction over forecast providers.
//!
//! Both upstream services are free and keyless; the adapters differ only in
//! how they fetch and how their payloads map onto [`crate::model::Weather`].

use crate::{
    model::{Location, Weather},
    provider::{nws::NwsProvider, openmeteo::OpenMeteoProvider},
    settings::AppSettings,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug};
use thiserror::Error;

pub mod nws;
pub mod openmeteo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Nws,
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Nws => "nws",
            ProviderId::OpenMeteo => "openmeteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Nws, ProviderId::OpenMeteo]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nws" => Ok(ProviderId::Nws),
            "openmeteo" | "open-meteo" => Ok(ProviderId::OpenMeteo),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: nws, openmeteo."
            )),
        }
    }
}

/// Errors shared by the provider adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service has no forecast grid for these coordinates. Raised by
    /// NWS for locations outside the United States.
    #[error("{provider} has no coverage for ({latitude:.4}, {longitude:.4})")]
    OutsideCoverage {
        provider: ProviderId,
        latitude: f64,
        longitude: f64,
    },

    #[error("{provider} request failed with status {status}: {body}")]
    Http {
        provider: ProviderId,
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Fetch and normalize the full forecast for a location.
    async fn fetch_weather(&self, location: &Location) -> anyhow::Result<Weather>;
}

/// Construct a provider for an explicit ProviderId.
pub fn provider_for(id: ProviderId) -> Box<dyn WeatherProvider> {
    match id {
        ProviderId::Nws => Box::new(NwsProvider::new()),
        ProviderId::OpenMeteo => Box::new(OpenMeteoProvider::new()),
    }
}

/// Construct the provider named by the settings' default forecast source.
pub fn default_provider(settings: &AppSettings) -> Box<dyn WeatherProvider> {
    provider_for(settings.default_forecast_source)
}

/// Keep error bodies short enough to read in a terminal.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
