//! Human-friendly forecast rendering.

use chrono::{DateTime, Utc};
use zephyr_core::icons;
use zephyr_core::model::{Current, Daily, Hourly, Location, Weather};
use zephyr_core::settings::AppSettings;

/// Terminal glyph for an icon asset key.
fn glyph(icon_key: &str) -> &'static str {
    match icon_key {
        "sun" => "☀",
        "moon" => "☾",
        "partly-cloudy-day" => "⛅",
        "cloud" => "☁",
        "rain" => "🌧",
        "storm" => "⛈",
        "snow" => "❄",
        "lightning" => "🌩",
        "windy" => "💨",
        _ => " ",
    }
}

fn fmt_opt(value: Option<f64>, precision: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v:.precision$}{suffix}"),
        None => "--".to_string(),
    }
}

fn fmt_time(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(t) => t.format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

pub fn print_header(location: &Location) {
    println!(
        "{} ({:.4}, {:.4}), source: {}",
        location.display_name(),
        location.latitude,
        location.longitude,
        location.forecast_source
    );
}

pub fn print_current(current: &Current, settings: &AppSettings) {
    let temp_unit = settings.temperature_unit;
    let speed_unit = settings.speed_unit;
    let pressure_unit = settings.pressure_unit;

    let icon = glyph(icons::icon_key(
        current.weather_code,
        current.is_daylight.unwrap_or(true),
    ));
    let text = current
        .weather_text
        .as_deref()
        .unwrap_or("Unknown conditions");

    let temperature = current
        .temperature
        .and_then(|t| t.temperature)
        .map(|c| temp_unit.convert(c));
    let apparent = current
        .temperature
        .and_then(|t| t.apparent)
        .map(|c| temp_unit.convert(c));

    println!("  {icon}  {text}");
    println!(
        "  {}  (feels like {})",
        fmt_opt(temperature, 0, temp_unit.suffix()),
        fmt_opt(apparent, 0, temp_unit.suffix()),
    );

    let wind = current
        .wind
        .and_then(|w| w.speed)
        .map(|kmh| speed_unit.convert(kmh));
    println!(
        "  wind {}   humidity {}   pressure {}",
        fmt_opt(wind, 0, &format!(" {}", speed_unit.suffix())),
        fmt_opt(current.relative_humidity, 0, "%"),
        fmt_opt(
            current.pressure.map(|hpa| pressure_unit.convert(hpa)),
            1,
            &format!(" {}", pressure_unit.suffix())
        ),
    );
}

pub fn print_daily(days: &[Daily], settings: &AppSettings) {
    let temp_unit = settings.temperature_unit;

    println!(
        "  {:<11} {:<3} {:<18} {:>6} {:>6} {:>5}  {:>5}–{:<5} {:>6}",
        "date", "", "conditions", "high", "low", "rain", "rise", "set", "sun"
    );

    for day in days {
        let half = day.day.as_ref();
        let icon = glyph(icons::icon_key(half.and_then(|h| h.weather_code), true));
        let text = half
            .and_then(|h| h.weather_text.as_deref())
            .unwrap_or("--");

        let high = half
            .and_then(|h| h.temperature)
            .and_then(|t| t.temperature)
            .map(|c| temp_unit.convert(c));
        let low = day
            .night
            .as_ref()
            .and_then(|h| h.temperature)
            .and_then(|t| t.temperature)
            .map(|c| temp_unit.convert(c));
        let pop = half
            .and_then(|h| h.precipitation_probability)
            .and_then(|p| p.total);

        let sun = day.sun.unwrap_or_default();

        println!(
            "  {:<11} {:<3} {:<18} {:>6} {:>6} {:>5}  {:>5}–{:<5} {:>6}",
            day.date.format("%a %b %d"),
            icon,
            text,
            fmt_opt(high, 0, temp_unit.suffix()),
            fmt_opt(low, 0, temp_unit.suffix()),
            fmt_opt(pop, 0, "%"),
            fmt_time(sun.rise_time),
            fmt_time(sun.set_time),
            fmt_opt(day.hours_of_sun, 1, "h"),
        );
    }
}

pub fn print_hourly(hours: &[Hourly], settings: &AppSettings) {
    let temp_unit = settings.temperature_unit;

    for hour in hours {
        let icon = glyph(icons::icon_key(
            hour.weather_code,
            hour.is_daylight.unwrap_or(true),
        ));
        let temp = hour
            .temperature
            .and_then(|t| t.temperature)
            .map(|c| temp_unit.convert(c));
        let pop = hour
            .precipitation_probability
            .and_then(|p| p.total);

        println!(
            "  {:>5}  {:<3} {:>6}  {:>4}  {}",
            hour.date.format("%H:%M"),
            icon,
            fmt_opt(temp, 0, temp_unit.suffix()),
            fmt_opt(pop, 0, "%"),
            hour.weather_text.as_deref().unwrap_or("--"),
        );
    }
}

pub fn print_alerts(weather: &Weather) {
    if weather.alerts.is_empty() {
        return;
    }

    println!();
    println!("  {} active alert(s):", weather.alerts.len());
    for alert in &weather.alerts {
        println!(
            "  [{:?}] {}",
            alert.severity,
            alert.headline.as_deref().unwrap_or("(no headline)")
        );
    }
}
