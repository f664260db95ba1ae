//! Sunrise/sunset ephemeris.
//!
//! Low-precision geocentric solar position approximation, after the
//! formulas at <https://www.aa.quae.nl/en/reken/zonpositie.html>. Accuracy
//! is on the order of an arc-minute, which is plenty for forecast display.
//!
//! All functions are pure: same inputs, same outputs, no I/O.

use chrono::{DateTime, Utc};
use std::f64::consts::PI;

use crate::model::MoonPhase;

const RAD: f64 = PI / 180.0;
const DAY_MS: f64 = 86_400_000.0;
/// Julian day of the Unix epoch.
const J1970: f64 = 2_440_588.0;
/// Julian day of the J2000.0 epoch.
const J2000: f64 = 2_451_545.0;
/// Obliquity of the Earth.
const E: f64 = RAD * 23.4397;
const J0: f64 = 0.0009;

/// Sun event instants for one calendar day, all in UTC.
///
/// `sunrise` and `sunset` are `None` during polar day or polar night, when
/// the sun never crosses the horizon and the hour-angle computation leaves
/// the domain of `acos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub solar_noon: Option<DateTime<Utc>>,
    pub nadir: Option<DateTime<Utc>>,
}

fn to_julian(date: DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64 / DAY_MS - 0.5 + J1970
}

/// Inverse of `to_julian`. Truncates to whole milliseconds, the native
/// resolution of the output instant. `None` for non-finite Julian values.
fn from_julian(j: f64) -> Option<DateTime<Utc>> {
    let ms = (j + 0.5 - J1970) * DAY_MS;
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}

fn to_days(date: DateTime<Utc>) -> f64 {
    to_julian(date) - J2000
}

fn solar_mean_anomaly(d: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * d)
}

fn ecliptic_longitude(m: f64) -> f64 {
    // equation of center
    let c = RAD * (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin());
    // perihelion of the Earth
    let p = RAD * 102.9372;
    m + c + p + PI
}

fn declination(l: f64) -> f64 {
    (l.sin() * E.sin()).asin()
}

fn julian_cycle(d: f64, lw: f64) -> f64 {
    (d - J0 - lw / (2.0 * PI)).round()
}

fn approx_transit(ht: f64, lw: f64, n: f64) -> f64 {
    J0 + (ht + lw) / (2.0 * PI) + n
}

fn solar_transit_j(ds: f64, m: f64, l: f64) -> f64 {
    J2000 + ds + 0.0053 * m.sin() - 0.0069 * (2.0 * l).sin()
}

/// Hour angle at which the sun's altitude equals `h`. `NaN` when the sun
/// stays above or below that altitude all day.
fn hour_angle(h: f64, phi: f64, dec: f64) -> f64 {
    ((h.sin() - phi.sin() * dec.sin()) / (phi.cos() * dec.cos())).acos()
}

/// Horizon dip in degrees for an observer `height` meters above the
/// horizon reference.
fn observer_angle(height: f64) -> f64 {
    -2.076 * height.sqrt() / 60.0
}

fn set_j(h: f64, lw: f64, phi: f64, dec: f64, n: f64, m: f64, l: f64) -> f64 {
    let w = hour_angle(h, phi, dec);
    let a = approx_transit(w, lw, n);
    solar_transit_j(a, m, l)
}

/// Compute sunrise, sunset, solar noon and nadir for the calendar day of
/// `date` at the given coordinates.
///
/// `latitude`/`longitude` are decimal degrees (WGS84); `elevation_m` is the
/// observer height in meters above the horizon reference. Inputs are not
/// validated; out-of-range coordinates produce mathematically defined but
/// physically meaningless results.
pub fn sun_times(
    date: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    elevation_m: f64,
) -> SunTimes {
    let lw = RAD * -longitude;
    let phi = RAD * latitude;

    let dh = observer_angle(elevation_m);

    let d = to_days(date);
    let n = julian_cycle(d, lw);
    let ds = approx_transit(0.0, lw, n);

    let m = solar_mean_anomaly(ds);
    let l = ecliptic_longitude(m);
    let dec = declination(l);

    let j_noon = solar_transit_j(ds, m, l);

    // altitude of the sun's center at rise/set, refraction included
    let h0 = RAD * (-0.833 + dh);

    let j_set = set_j(h0, lw, phi, dec, n, m, l);
    let j_rise = j_noon - (j_set - j_noon);

    SunTimes {
        sunrise: from_julian(j_rise),
        sunset: from_julian(j_set),
        solar_noon: from_julian(j_noon),
        nadir: from_julian(j_noon - 0.5),
    }
}

/// Hours of daylight for the calendar day of `date`, at sea level.
///
/// `NaN` during polar day or polar night, mirroring the absent sunrise and
/// sunset instants.
pub fn daylight_duration_hours(date: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let times = sun_times(date, latitude, longitude, 0.0);
    match (times.sunrise, times.sunset) {
        (Some(rise), Some(set)) => {
            (set.timestamp_millis() - rise.timestamp_millis()) as f64 / 3_600_000.0
        }
        _ => f64::NAN,
    }
}

/// Synodic month length in days.
const LUNAR_CYCLE_DAYS: f64 = 29.530_59;
/// New moon of 2000-01-06 18:14 UTC, in Unix milliseconds.
const KNOWN_NEW_MOON_MS: i64 = 947_182_440_000;

/// Eight-bucket lunar phase approximation, anchored at a known new moon.
pub fn moon_phase(date: DateTime<Utc>) -> MoonPhase {
    let elapsed = (date.timestamp_millis() - KNOWN_NEW_MOON_MS) as f64;
    let phase = (elapsed / (LUNAR_CYCLE_DAYS * DAY_MS)).rem_euclid(1.0);

    if phase < 0.0625 {
        MoonPhase::NewMoon
    } else if phase < 0.1875 {
        MoonPhase::WaxingCrescent
    } else if phase < 0.3125 {
        MoonPhase::FirstQuarter
    } else if phase < 0.4375 {
        MoonPhase::WaxingGibbous
    } else if phase < 0.5625 {
        MoonPhase::FullMoon
    } else if phase < 0.6875 {
        MoonPhase::WaningGibbous
    } else if phase < 0.8125 {
        MoonPhase::ThirdQuarter
    } else if phase < 0.9375 {
        MoonPhase::WaningCrescent
    } else {
        MoonPhase::NewMoon
    }
}
