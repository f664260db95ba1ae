//! Property tests for the solar ephemeris calculator.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use zephyr_core::sun::{daylight_duration_hours, sun_times};

/// Latitudes in the temperate band, where the sun rises and sets every day.
fn temperate_latitude_strategy() -> impl Strategy<Value = f64> {
    -59.0..=59.0
}

fn longitude_strategy() -> impl Strategy<Value = f64> {
    -180.0..=180.0
}

/// Dates across four years, at day granularity.
fn date_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365 * 4).prop_map(|offset| {
        Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap() + Duration::days(offset)
    })
}

proptest! {
    /// Within the temperate band the three day events always exist and are
    /// strictly ordered.
    #[test]
    fn sunrise_noon_sunset_are_ordered(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy()
    ) {
        let times = sun_times(date, lat, lon, 0.0);

        let rise = times.sunrise.expect("sunrise exists below 60°");
        let noon = times.solar_noon.expect("solar noon always exists");
        let set = times.sunset.expect("sunset exists below 60°");

        prop_assert!(rise < noon, "sunrise {rise} not before noon {noon}");
        prop_assert!(noon < set, "noon {noon} not before sunset {set}");
    }

    /// Sunrise and sunset mirror each other around solar noon.
    #[test]
    fn times_are_symmetric_around_noon(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy()
    ) {
        let times = sun_times(date, lat, lon, 0.0);

        let rise = times.sunrise.unwrap().timestamp_millis();
        let noon = times.solar_noon.unwrap().timestamp_millis();
        let set = times.sunset.unwrap().timestamp_millis();

        // 1e-6 days, plus a couple of milliseconds of truncation slack
        prop_assert!(((noon - rise) - (set - noon)).abs() <= 89);
    }

    /// Nadir is exactly half a day before solar noon.
    #[test]
    fn nadir_mirrors_noon(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy()
    ) {
        let times = sun_times(date, lat, lon, 0.0);

        let noon = times.solar_noon.unwrap().timestamp_millis();
        let nadir = times.nadir.unwrap().timestamp_millis();

        prop_assert!((noon - nadir - 43_200_000).abs() <= 1);
    }

    /// The calculator is a pure function.
    #[test]
    fn computation_is_deterministic(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy(),
        elevation in 0.0..4000.0f64
    ) {
        let a = sun_times(date, lat, lon, elevation);
        let b = sun_times(date, lat, lon, elevation);

        prop_assert_eq!(a, b);
    }

    /// A raised observer sees the sun earlier and loses it later.
    #[test]
    fn elevation_never_shortens_the_day(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy()
    ) {
        let sea = sun_times(date, lat, lon, 0.0);
        let peak = sun_times(date, lat, lon, 2000.0);

        prop_assert!(peak.sunrise.unwrap() <= sea.sunrise.unwrap());
        prop_assert!(peak.sunset.unwrap() >= sea.sunset.unwrap());
    }

    /// Daylight duration agrees with the sunrise/sunset pair it is
    /// derived from.
    #[test]
    fn duration_matches_sun_times(
        lat in temperate_latitude_strategy(),
        lon in longitude_strategy(),
        date in date_strategy()
    ) {
        let times = sun_times(date, lat, lon, 0.0);
        let hours = daylight_duration_hours(date, lat, lon);

        let span_ms = times.sunset.unwrap().timestamp_millis()
            - times.sunrise.unwrap().timestamp_millis();
        let expected = span_ms as f64 / 3_600_000.0;

        prop_assert!((hours - expected).abs() < 1e-9);
        prop_assert!(hours > 0.0 && hours < 24.0);
    }
}
