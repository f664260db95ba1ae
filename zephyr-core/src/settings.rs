//! User settings and display-unit conversions.
//!
//! The model stores everything metric; these enums convert a metric value
//! to whatever the user picked, in one place instead of at every call site.

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::provider::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    Kmh,
    Mph,
    Ms,
    Kn,
}

impl SpeedUnit {
    pub fn convert(&self, kmh: f64) -> f64 {
        match self {
            SpeedUnit::Kmh => kmh,
            SpeedUnit::Mph => kmh / 1.609_34,
            SpeedUnit::Ms => kmh / 3.6,
            SpeedUnit::Kn => kmh / 1.852,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            SpeedUnit::Kmh => "km/h",
            SpeedUnit::Mph => "mph",
            SpeedUnit::Ms => "m/s",
            SpeedUnit::Kn => "kn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    Hpa,
    Mb,
    Inhg,
    Mmhg,
}

impl PressureUnit {
    pub fn convert(&self, hpa: f64) -> f64 {
        match self {
            // millibars and hectopascals are the same quantity
            PressureUnit::Hpa | PressureUnit::Mb => hpa,
            PressureUnit::Inhg => hpa * 0.029_53,
            PressureUnit::Mmhg => hpa * 0.750_062,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            PressureUnit::Hpa => "hPa",
            PressureUnit::Mb => "mb",
            PressureUnit::Inhg => "inHg",
            PressureUnit::Mmhg => "mmHg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationUnit {
    Mm,
    Inch,
}

impl PrecipitationUnit {
    pub fn convert(&self, mm: f64) -> f64 {
        match self {
            PrecipitationUnit::Mm => mm,
            PrecipitationUnit::Inch => mm / 25.4,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            PrecipitationUnit::Mm => "mm",
            PrecipitationUnit::Inch => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Km,
    Mi,
}

impl DistanceUnit {
    pub fn convert(&self, km: f64) -> f64 {
        match self {
            DistanceUnit::Km => km,
            DistanceUnit::Mi => km / 1.609_344,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            DistanceUnit::Km => "km",
            DistanceUnit::Mi => "mi",
        }
    }
}

/// Top-level settings stored on disk as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub theme: ThemeMode,
    pub temperature_unit: TemperatureUnit,
    pub speed_unit: SpeedUnit,
    pub pressure_unit: PressureUnit,
    pub precipitation_unit: PrecipitationUnit,
    pub distance_unit: DistanceUnit,
    pub default_forecast_source: ProviderId,
    /// Minutes between automatic refreshes.
    pub refresh_interval: u32,
    pub show_notifications: bool,
    pub alert_notifications: bool,
    pub precipitation_notifications: bool,
    pub today_forecast_notifications: bool,
    pub tomorrow_forecast_notifications: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::System,
            temperature_unit: TemperatureUnit::Fahrenheit,
            speed_unit: SpeedUnit::Mph,
            pressure_unit: PressureUnit::Inhg,
            precipitation_unit: PrecipitationUnit::Inch,
            distance_unit: DistanceUnit::Mi,
            default_forecast_source: ProviderId::Nws,
            refresh_interval: 60,
            show_notifications: true,
            alert_notifications: true,
            precipitation_notifications: false,
            today_forecast_notifications: false,
            tomorrow_forecast_notifications: false,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, or return defaults if no file exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::settings_file_path()?;
        Self::load_from(&path)
    }

    /// Save settings to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_file_path()?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no settings file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: AppSettings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the settings file.
    pub fn settings_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("settings.toml"))
    }
}

/// Platform directories shared by settings, state and the widget bridge.
pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "zephyrweather", "zephyr")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
