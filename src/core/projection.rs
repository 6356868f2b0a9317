use thiserror::Error;

use crate::models::{Coordinate, LATITUDE_LIMIT, LONGITUDE_LIMIT};

pub const DEFAULT_CENTER_LATITUDE: f64 = 39.9042;
pub const DEFAULT_CENTER_LONGITUDE: f64 = 116.4074;
pub const DEFAULT_SPAN_DEGREES: f64 = 0.1;

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("span must be a positive number of degrees, got {0}")]
    InvalidSpan(f64),
    #[error("map box leaves the valid coordinate range")]
    OutOfBounds,
}

/// Linear mapping from a point on a flat pick surface to a coordinate.
///
/// The surface stands for a fixed box of `latitude_span` x `longitude_span`
/// degrees centred on the configured point. This is a plain interpolation,
/// not a map projection: it ignores the earth's curvature and is only meant
/// for picking a location near the centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapProjection {
    center_latitude: f64,
    center_longitude: f64,
    latitude_span: f64,
    longitude_span: f64,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            center_latitude: DEFAULT_CENTER_LATITUDE,
            center_longitude: DEFAULT_CENTER_LONGITUDE,
            latitude_span: DEFAULT_SPAN_DEGREES,
            longitude_span: DEFAULT_SPAN_DEGREES,
        }
    }
}

impl MapProjection {
    pub fn new(
        center_latitude: f64,
        center_longitude: f64,
        latitude_span: f64,
        longitude_span: f64,
    ) -> Result<Self, ProjectionError> {
        for span in [latitude_span, longitude_span] {
            if !span.is_finite() || span <= 0.0 {
                return Err(ProjectionError::InvalidSpan(span));
            }
        }

        let half_lat = latitude_span / 2.0;
        let half_lon = longitude_span / 2.0;
        let fits = center_latitude - half_lat >= -LATITUDE_LIMIT
            && center_latitude + half_lat <= LATITUDE_LIMIT
            && center_longitude - half_lon >= -LONGITUDE_LIMIT
            && center_longitude + half_lon <= LONGITUDE_LIMIT;
        if !fits {
            return Err(ProjectionError::OutOfBounds);
        }

        Ok(Self {
            center_latitude,
            center_longitude,
            latitude_span,
            longitude_span,
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_latitude, self.center_longitude)
    }

    pub fn spans(&self) -> (f64, f64) {
        (self.latitude_span, self.longitude_span)
    }

    /// Maps a pick at (`pick_x`, `pick_y`) on a `width` x `height` surface.
    ///
    /// Picks outside the surface are pulled back onto its edge, and an empty
    /// surface maps everything to the centre.
    pub fn project(&self, pick_x: f64, pick_y: f64, width: f64, height: f64) -> Coordinate {
        let x_ratio = surface_ratio(pick_x, width);
        let y_ratio = surface_ratio(pick_y, height);

        let latitude = self.center_latitude + (y_ratio - 0.5) * self.latitude_span;
        let longitude = self.center_longitude + (x_ratio - 0.5) * self.longitude_span;

        Coordinate::clamped(latitude, longitude)
    }
}

fn surface_ratio(position: f64, extent: f64) -> f64 {
    if !extent.is_finite() || extent <= 0.0 || !position.is_finite() {
        return 0.5;
    }
    (position / extent).clamp(0.0, 1.0)
}
