//! Telemetry records as supplied by the upstream parser.
//!
//! The parser collaborator is responsible for enforcing the orbital ranges
//! before a record reaches the frame builder; `validate_ranges` is the typed
//! check it calls. The coding core itself never clamps or re-validates.

use serde::Serialize;

use crate::types::{EncodeError, EncodeResult};

/// Orbital validation ranges (LEO telemetry contract).
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LON_RANGE: (f64, f64) = (-180.0, 180.0);
pub const ALT_RANGE_KM: (f64, f64) = (300.0, 500.0);
pub const VEL_RANGE_KMH: (f64, f64) = (27_000.0, 28_000.0);

/// Satellite illumination state, one byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Daylight,
    Eclipsed,
    Deepnight,
    Unknown,
}

impl Visibility {
    /// Wire code used at payload offset 44.
    pub fn code(self) -> u8 {
        match self {
            Visibility::Daylight => 0x01,
            Visibility::Eclipsed => 0x02,
            Visibility::Deepnight => 0x03,
            Visibility::Unknown => 0x00,
        }
    }

    /// Decode a wire code. Unrecognized codes map to `Unknown`.
    pub fn from_code(code: u8) -> Visibility {
        match code {
            0x01 => Visibility::Daylight,
            0x02 => Visibility::Eclipsed,
            0x03 => Visibility::Deepnight,
            _ => Visibility::Unknown,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Daylight => write!(f, "daylight"),
            Visibility::Eclipsed => write!(f, "eclipsed"),
            Visibility::Deepnight => write!(f, "deepnight"),
            Visibility::Unknown => write!(f, "unknown"),
        }
    }
}

/// One parsed telemetry sample for a tracked satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// 16-bit satellite identifier.
    pub sat_id: u16,
    /// Unix timestamp, seconds.
    pub timestamp: i64,
    /// Sub-satellite latitude, degrees.
    pub latitude: f64,
    /// Sub-satellite longitude, degrees.
    pub longitude: f64,
    /// Altitude above mean sea level, km.
    pub altitude: f64,
    /// Orbital velocity, km/h.
    pub velocity: f64,
    /// Visibility footprint diameter, km.
    pub footprint: f64,
    /// Days since orbital epoch.
    pub daynum: f64,
    /// Sub-solar latitude, degrees.
    pub solar_lat: f64,
    /// Sub-solar longitude, degrees.
    pub solar_lon: f64,
    pub visibility: Visibility,
    /// Units tag from the upstream source, e.g. "km".
    pub units: String,
}

impl TelemetryRecord {
    /// Range check the parser applies before handing a record to the core.
    ///
    /// Out-of-range values are a parse failure; nothing downstream clamps.
    pub fn validate_ranges(&self) -> EncodeResult<()> {
        if !(LAT_RANGE.0..=LAT_RANGE.1).contains(&self.latitude) {
            return Err(EncodeError::OutOfRange("latitude"));
        }
        if !(LON_RANGE.0..=LON_RANGE.1).contains(&self.longitude) {
            return Err(EncodeError::OutOfRange("longitude"));
        }
        if !(ALT_RANGE_KM.0..=ALT_RANGE_KM.1).contains(&self.altitude) {
            return Err(EncodeError::OutOfRange("altitude"));
        }
        if !(VEL_RANGE_KMH.0..=VEL_RANGE_KMH.1).contains(&self.velocity) {
            return Err(EncodeError::OutOfRange("velocity"));
        }
        Ok(())
    }
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        TelemetryRecord {
            sat_id: 0,
            timestamp: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 400.0,
            velocity: 27_500.0,
            footprint: 0.0,
            daynum: 0.0,
            solar_lat: 0.0,
            solar_lon: 0.0,
            visibility: Visibility::Unknown,
            units: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
