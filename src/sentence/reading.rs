//! # Reading Snapshots
//!
//! Scalar readings the sensor and navigation collaborators hand to the
//! encoder, one fresh snapshot per broadcast cycle. Values are formatted as
//! given; nothing here checks sensor sanity.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Deserialize;

use super::protocol::NOMINAL_SUPPLY_VOLTAGE;

/// UTC time of a GPS fix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centisecond: u8,
}

impl Timestamp {
    /// Split a UTC date-time into sentence fields
    ///
    /// Centiseconds come from the sub-second nanoseconds divided by 10^7.
    /// A leap second (nanos >= 10^9) is capped at 99.
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        Self {
            year: u16::try_from(time.year()).unwrap_or_default(),
            month: time.month() as u8,
            day: time.day() as u8,
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
            centisecond: (time.nanosecond() / 10_000_000).min(99) as u8,
        }
    }

    /// Current UTC time
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }
}

/// One snapshot of everything the sentences can carry
///
/// Every field is optional on the JSON feed; missing values default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Reading {
    /// Barometric altitude in meters
    pub altitude_m: i32,

    /// Filtered climb rate in cm/s
    pub climb_cps: i32,

    /// Supply voltage in volts
    pub supply_voltage: f32,

    /// UTC time of the GPS fix, stamped on receipt when absent
    pub time: Option<Timestamp>,

    /// Latitude in degrees
    pub latitude_deg: f64,

    /// Longitude in degrees
    pub longitude_deg: f64,

    /// GPS altitude above mean sea level in meters
    pub gps_altitude_m: f64,

    /// Ground speed in m/s
    pub ground_speed_mps: f64,

    /// Course over ground in degrees
    pub heading_deg: f64,

    /// Raw barometric sample in Pa, absent without a pressure sensor
    pub pressure_pa: Option<f64>,
}

impl Reading {
    /// Fill in a missing timestamp with the current UTC time
    pub fn stamped(mut self) -> Self {
        if self.time.is_none() {
            self.time = Some(Timestamp::now());
        }
        self
    }

    /// Navigation trace for the XCTRC sentence
    ///
    /// Uses the reading's own timestamp, or the current UTC time when the
    /// snapshot carries none.
    pub fn nav_trace(&self) -> NavTrace {
        NavTrace {
            time: self.time.unwrap_or_else(Timestamp::now),
            latitude_deg: self.latitude_deg,
            longitude_deg: self.longitude_deg,
            altitude_m: self.gps_altitude_m,
            ground_speed_mps: self.ground_speed_mps,
            heading_deg: self.heading_deg,
            climb_cps: self.climb_cps,
            pressure_pa: self.pressure_pa,
            supply_voltage: self.supply_voltage,
        }
    }
}

/// Inputs of the XCTRC navigation trace sentence
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavTrace {
    pub time: Timestamp,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub ground_speed_mps: f64,
    pub heading_deg: f64,
    pub climb_cps: i32,
    pub pressure_pa: Option<f64>,
    pub supply_voltage: f32,
}

/// Battery indication in percent of the nominal 5 V supply rail
///
/// Over-volted supplies are clamped to 100, not reported as errors.
///
/// # Examples
///
/// ```
/// use vario_telemetry::sentence::reading::battery_percent;
///
/// assert_eq!(battery_percent(5.0), 100);
/// assert_eq!(battery_percent(6.0), 100);
/// assert_eq!(battery_percent(2.5), 50);
/// ```
pub fn battery_percent(supply_voltage: f32) -> u8 {
    let percent = (f64::from(supply_voltage) * 100.0 / NOMINAL_SUPPLY_VOLTAGE) as i32;
    percent.clamp(0, 100) as u8
}
