//! Weather-code to icon-asset mapping.
//!
//! One table, consulted by every presentation surface, instead of per-screen
//! conditionals. Day and night share a row; codes without a night variant
//! reuse the day asset.

use crate::model::WeatherCode;

#[derive(Debug, Clone, Copy)]
pub struct IconMapping {
    pub code: WeatherCode,
    pub day: &'static str,
    pub night: &'static str,
}

pub const ICON_TABLE: &[IconMapping] = &[
    IconMapping { code: WeatherCode::Clear, day: "sun", night: "moon" },
    IconMapping { code: WeatherCode::PartlyCloudy, day: "partly-cloudy-day", night: "moon" },
    IconMapping { code: WeatherCode::Cloudy, day: "cloud", night: "cloud" },
    IconMapping { code: WeatherCode::RainLight, day: "rain", night: "rain" },
    IconMapping { code: WeatherCode::Rain, day: "rain", night: "rain" },
    IconMapping { code: WeatherCode::RainHeavy, day: "storm", night: "storm" },
    IconMapping { code: WeatherCode::SnowLight, day: "snow", night: "snow" },
    IconMapping { code: WeatherCode::Snow, day: "snow", night: "snow" },
    IconMapping { code: WeatherCode::SnowHeavy, day: "snow", night: "snow" },
    IconMapping { code: WeatherCode::Sleet, day: "snow", night: "snow" },
    IconMapping { code: WeatherCode::Hail, day: "snow", night: "snow" },
    IconMapping { code: WeatherCode::Thunderstorm, day: "lightning", night: "lightning" },
    IconMapping { code: WeatherCode::Fog, day: "cloud", night: "cloud" },
    IconMapping { code: WeatherCode::Haze, day: "cloud", night: "cloud" },
    IconMapping { code: WeatherCode::Wind, day: "windy", night: "windy" },
];

/// Icon asset key for a condition. An unset code falls back to the clear-sky
/// asset for the current half of the day.
pub fn icon_key(code: Option<WeatherCode>, is_day: bool) -> &'static str {
    let fallback = if is_day { "sun" } else { "moon" };

    let Some(code) = code else {
        return fallback;
    };

    ICON_TABLE
        .iter()
        .find(|m| m.code == code)
        .map(|m| if is_day { m.day } else { m.night })
        .unwrap_or(fallback)
}
