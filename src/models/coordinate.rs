use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LATITUDE_LIMIT: f64 = 90.0;
pub const LONGITUDE_LIMIT: f64 = 180.0;

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A validated WGS84 position.
///
/// Latitude and longitude are kept at 6 decimal places and altitude at 2.
/// `captured_at` is copied verbatim from the source metadata and never parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
    #[serde(
        default,
        rename = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    captured_at: Option<String>,
}

/// Wire shape of a coordinate before range checks.
#[derive(Deserialize)]
struct UncheckedCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default, rename = "timestamp")]
    captured_at: Option<String>,
}

impl TryFrom<UncheckedCoordinate> for Coordinate {
    type Error = RangeError;

    fn try_from(raw: UncheckedCoordinate) -> Result<Self, Self::Error> {
        Ok(Coordinate::new(raw.latitude, raw.longitude)?
            .with_altitude(raw.altitude)
            .with_captured_at(raw.captured_at))
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RangeError> {
        let latitude = round_degrees(latitude);
        let longitude = round_degrees(longitude);

        if !(-LATITUDE_LIMIT..=LATITUDE_LIMIT).contains(&latitude) {
            return Err(RangeError::Latitude(latitude));
        }
        if !(-LONGITUDE_LIMIT..=LONGITUDE_LIMIT).contains(&longitude) {
            return Err(RangeError::Longitude(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
            altitude: None,
            captured_at: None,
        })
    }

    /// Builds a coordinate from finite values, pinning them into range.
    pub(crate) fn clamped(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: round_degrees(latitude.clamp(-LATITUDE_LIMIT, LATITUDE_LIMIT)),
            longitude: round_degrees(longitude.clamp(-LONGITUDE_LIMIT, LONGITUDE_LIMIT)),
            altitude: None,
            captured_at: None,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn captured_at(&self) -> Option<&str> {
        self.captured_at.as_deref()
    }

    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude.filter(|value| value.is_finite()).map(round_altitude);
        self
    }

    pub fn with_captured_at(mut self, captured_at: Option<String>) -> Self {
        self.captured_at = captured_at;
        self
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.altitude {
            Some(altitude) => write!(
                f,
                "{:.6}, {:.6} @ {altitude:.2}m",
                self.latitude, self.longitude
            ),
            None => write!(f, "{:.6}, {:.6}", self.latitude, self.longitude),
        }
    }
}

pub fn round_degrees(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

pub fn round_altitude(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
