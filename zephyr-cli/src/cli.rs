use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select};

use zephyr_core::geocoding::Geocoder;
use zephyr_core::model::{Location, Weather};
use zephyr_core::provider::{ProviderError, ProviderId, provider_for};
use zephyr_core::settings::{
    AppSettings, DistanceUnit, PrecipitationUnit, PressureUnit, SpeedUnit, TemperatureUnit,
};
use zephyr_core::store::AppState;
use zephyr_core::sun::{daylight_duration_hours, sun_times};
use zephyr_core::widget;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "zephyr", version, about = "Zephyr weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search for places by name.
    Search {
        /// Place name, e.g. "London".
        query: String,
    },

    /// Add a place to the saved locations.
    Add {
        /// Place name, e.g. "London".
        query: String,

        /// Forecast source for this location: "nws" or "openmeteo".
        /// Defaults to the configured default source.
        #[arg(long)]
        source: Option<String>,
    },

    /// List saved locations.
    Locations,

    /// Remove a saved location by index or id.
    Remove {
        /// Index from `zephyr locations`, or a location id.
        target: String,
    },

    /// Select which saved location `show` and `refresh` act on.
    Switch {
        /// Index from `zephyr locations`.
        index: usize,
    },

    /// Fetch a fresh forecast for the selected location.
    Refresh {
        /// Refresh every saved location instead.
        #[arg(long)]
        all: bool,
    },

    /// Show the cached forecast for the selected location.
    Show {
        /// Include the hourly strip for the next 12 hours.
        #[arg(long)]
        hourly: bool,

        /// Include the daily table (the default view).
        #[arg(long)]
        daily: bool,
    },

    /// Print sunrise, sunset, solar noon and nadir for a coordinate.
    Sun {
        /// Latitude in decimal degrees.
        latitude: f64,

        /// Longitude in decimal degrees.
        longitude: f64,

        /// Calendar date, e.g. 2024-06-21; defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Observer elevation in meters.
        #[arg(long, default_value_t = 0.0)]
        elevation: f64,
    },

    /// Interactively configure units and the default forecast source.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut settings = AppSettings::load()?;
        let mut state = AppState::load()?;

        match self.command {
            Command::Search { query } => {
                let results = Geocoder::new().search(&query).await?;
                if results.is_empty() {
                    println!("No places found for '{query}'.");
                    return Ok(());
                }
                for place in &results {
                    println!(
                        "{:<40} ({:.4}, {:.4})",
                        place.label(),
                        place.latitude,
                        place.longitude
                    );
                }
            }

            Command::Add { query, source } => {
                let source = match source {
                    Some(s) => ProviderId::try_from(s.as_str())?,
                    None => settings.default_forecast_source,
                };

                let mut results = Geocoder::new().search(&query).await?;
                if results.is_empty() {
                    println!("No places found for '{query}'.");
                    return Ok(());
                }

                let place = if results.len() == 1 {
                    results.remove(0)
                } else {
                    let labels: Vec<String> = results.iter().map(|p| p.label()).collect();
                    let choice = Select::new("Which place did you mean?", labels)
                        .raw_prompt()
                        .context("Place selection was cancelled")?;
                    results.remove(choice.index)
                };

                let location = place.into_location(source);
                println!(
                    "Added {} ({:.4}, {:.4}), forecast source: {}",
                    location.display_name(),
                    location.latitude,
                    location.longitude,
                    location.forecast_source
                );

                state.add_location(location);
                state.save()?;
                widget::update_widgets(&state.locations, &settings);
            }

            Command::Locations => {
                if state.locations.is_empty() {
                    println!("No locations saved yet. Try `zephyr add <place>`.");
                    return Ok(());
                }
                for (index, location) in state.locations.iter().enumerate() {
                    let marker = if index == state.current_location_index {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{marker} [{index}] {:<24} ({:.4}, {:.4})  {}",
                        location.display_name(),
                        location.latitude,
                        location.longitude,
                        location.forecast_source
                    );
                }
            }

            Command::Remove { target } => {
                // accept either a list index or a raw id
                let id = match target.parse::<usize>() {
                    Ok(index) => state
                        .locations
                        .get(index)
                        .map(|l| l.id.clone())
                        .with_context(|| format!("No location at index {index}"))?,
                    Err(_) => target,
                };

                let before = state.locations.len();
                state.remove_location(&id);
                if state.locations.len() == before {
                    println!("No location matched '{id}'.");
                    return Ok(());
                }

                state.save()?;
                widget::update_widgets(&state.locations, &settings);
                println!("Removed.");
            }

            Command::Switch { index } => {
                if index >= state.locations.len() {
                    println!(
                        "No location at index {index}; there are {} saved.",
                        state.locations.len()
                    );
                    return Ok(());
                }
                state.set_current_index(index);
                state.save()?;
                println!(
                    "Now showing {}.",
                    state
                        .current_location()
                        .map(Location::display_name)
                        .unwrap_or("nothing")
                );
            }

            Command::Refresh { all } => {
                let targets: Vec<Location> = if all {
                    state.locations.clone()
                } else {
                    state.current_location().cloned().into_iter().collect()
                };

                if targets.is_empty() {
                    println!("No locations saved yet. Try `zephyr add <place>`.");
                    return Ok(());
                }

                for location in targets {
                    match fetch_with_fallback(&location).await {
                        Ok(weather) => {
                            println!(
                                "Refreshed {} ({} daily, {} hourly, {} alerts).",
                                location.display_name(),
                                weather.daily_forecast.len(),
                                weather.hourly_forecast.len(),
                                weather.alerts.len()
                            );
                            state.update_location_weather(&location.id, weather);
                        }
                        Err(err) => {
                            eprintln!(
                                "Failed to refresh {}: {err:#}",
                                location.display_name()
                            );
                        }
                    }
                }

                state.save()?;
                widget::update_widgets(&state.locations, &settings);
            }

            Command::Show { hourly, daily } => {
                let Some(location) = state.current_location() else {
                    println!("No locations saved yet. Try `zephyr add <place>`.");
                    return Ok(());
                };

                render::print_header(location);

                let Some(weather) = &location.weather else {
                    println!("No forecast cached yet. Run `zephyr refresh` first.");
                    return Ok(());
                };

                if let Some(current) = &weather.current {
                    render::print_current(current, &settings);
                }

                let now = Utc::now();

                if hourly {
                    println!();
                    let upcoming: Vec<_> = weather
                        .hourly_forecast
                        .iter()
                        .filter(|h| h.date >= now)
                        .take(12)
                        .cloned()
                        .collect();
                    render::print_hourly(&upcoming, &settings);
                }

                // daily is the default view unless only --hourly was asked for
                if daily || !hourly {
                    println!();
                    let days: Vec<_> = weather.daily_forecast.iter().take(7).cloned().collect();
                    render::print_daily(&days, &settings);
                }

                render::print_alerts(weather);
                println!();
                println!("  (times shown in UTC)");
            }

            Command::Sun {
                latitude,
                longitude,
                date,
                elevation,
            } => {
                let date = match date {
                    Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                        .context("Dates must look like 2024-06-21")?
                        .and_time(NaiveTime::MIN)
                        .and_utc(),
                    None => Utc::now(),
                };

                let times = sun_times(date, latitude, longitude, elevation);
                let fmt = |t: Option<chrono::DateTime<Utc>>| match t {
                    Some(t) => t.format("%H:%M:%S UTC").to_string(),
                    None => "--".to_string(),
                };

                println!("sunrise     {}", fmt(times.sunrise));
                println!("sunset      {}", fmt(times.sunset));
                println!("solar noon  {}", fmt(times.solar_noon));
                println!("nadir       {}", fmt(times.nadir));

                let hours = daylight_duration_hours(date, latitude, longitude);
                if hours.is_nan() {
                    println!("daylight    none (polar day or night)");
                } else {
                    println!("daylight    {hours:.2} h");
                }
            }

            Command::Configure => {
                let temp = Select::new(
                    "Temperature unit",
                    vec!["celsius", "fahrenheit"],
                )
                .prompt()?;
                settings.temperature_unit = match temp {
                    "celsius" => TemperatureUnit::Celsius,
                    _ => TemperatureUnit::Fahrenheit,
                };

                let speed = Select::new("Wind speed unit", vec!["kmh", "mph", "ms", "kn"])
                    .prompt()?;
                settings.speed_unit = match speed {
                    "kmh" => SpeedUnit::Kmh,
                    "ms" => SpeedUnit::Ms,
                    "kn" => SpeedUnit::Kn,
                    _ => SpeedUnit::Mph,
                };

                let pressure =
                    Select::new("Pressure unit", vec!["hpa", "mb", "inhg", "mmhg"]).prompt()?;
                settings.pressure_unit = match pressure {
                    "hpa" => PressureUnit::Hpa,
                    "mb" => PressureUnit::Mb,
                    "mmhg" => PressureUnit::Mmhg,
                    _ => PressureUnit::Inhg,
                };

                let precipitation =
                    Select::new("Precipitation unit", vec!["mm", "inch"]).prompt()?;
                settings.precipitation_unit = match precipitation {
                    "mm" => PrecipitationUnit::Mm,
                    _ => PrecipitationUnit::Inch,
                };

                let distance = Select::new("Distance unit", vec!["km", "mi"]).prompt()?;
                settings.distance_unit = match distance {
                    "km" => DistanceUnit::Km,
                    _ => DistanceUnit::Mi,
                };

                let source =
                    Select::new("Default forecast source", vec!["nws", "openmeteo"]).prompt()?;
                settings.default_forecast_source = ProviderId::try_from(source)?;

                settings.refresh_interval = CustomType::<u32>::new("Refresh interval (minutes)")
                    .with_default(settings.refresh_interval)
                    .prompt()?;

                settings.save()?;
                println!(
                    "Settings saved to {}",
                    AppSettings::settings_file_path()?.display()
                );
            }
        }

        Ok(())
    }
}

/// Fetch via the location's own source; when that source is NWS and the
/// location turns out to be outside its coverage, retry with Open-Meteo.
async fn fetch_with_fallback(location: &Location) -> Result<Weather> {
    let provider = provider_for(location.forecast_source);

    match provider.fetch_weather(location).await {
        Ok(weather) => Ok(weather),
        Err(err) => {
            let outside_coverage = matches!(
                err.downcast_ref::<ProviderError>(),
                Some(ProviderError::OutsideCoverage { .. })
            );

            if outside_coverage && location.forecast_source == ProviderId::Nws {
                eprintln!(
                    "{} is outside NWS coverage; falling back to Open-Meteo.",
                    location.display_name()
                );
                provider_for(ProviderId::OpenMeteo)
                    .fetch_weather(location)
                    .await
            } else {
                Err(err)
            }
        }
    }
}
