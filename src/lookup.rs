//! Place names for a picked coordinate.

use thiserror::Error;
use tracing::debug;

use crate::models::Coordinate;

pub const CUSTOM_LOCATION_LABEL: &str = "Custom location";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no place known for {0}")]
    NoMatch(Coordinate),
    #[error("lookup request failed: {0}")]
    RequestFailed(String),
}

#[async_trait::async_trait]
pub trait ReverseLookup: Send + Sync {
    async fn lookup(&self, coordinate: &Coordinate) -> Result<String, LookupError>;
}

/// Resolves a display label, falling back to [`CUSTOM_LOCATION_LABEL`] on any failure.
pub async fn label_for(lookup: &dyn ReverseLookup, coordinate: &Coordinate) -> String {
    match lookup.lookup(coordinate).await {
        Ok(label) if !label.trim().is_empty() => label,
        Ok(_) => String::from(CUSTOM_LOCATION_LABEL),
        Err(err) => {
            debug!("reverse lookup fell back to default label: {err}");
            String::from(CUSTOM_LOCATION_LABEL)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedRegion {
    pub label: String,
    pub latitude: (f64, f64),
    pub longitude: (f64, f64),
}

impl NamedRegion {
    pub fn new(label: impl Into<String>, latitude: (f64, f64), longitude: (f64, f64)) -> Self {
        Self {
            label: label.into(),
            latitude,
            longitude,
        }
    }

    /// Bounds are exclusive on every side.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.latitude() > self.latitude.0
            && coordinate.latitude() < self.latitude.1
            && coordinate.longitude() > self.longitude.0
            && coordinate.longitude() < self.longitude.1
    }
}

/// Offline lookup against a fixed list of boxes. First match wins.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionTable {
    regions: Vec<NamedRegion>,
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new(vec![
            NamedRegion::new("Beijing city centre", (39.8, 40.0), (116.3, 116.5)),
            NamedRegion::new("Shanghai city centre", (31.1, 31.3), (121.4, 121.6)),
        ])
    }
}

impl RegionTable {
    pub fn new(regions: Vec<NamedRegion>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[NamedRegion] {
        &self.regions
    }

    pub fn find(&self, coordinate: &Coordinate) -> Option<&NamedRegion> {
        self.regions
            .iter()
            .find(|region| region.contains(coordinate))
    }
}

#[async_trait::async_trait]
impl ReverseLookup for RegionTable {
    async fn lookup(&self, coordinate: &Coordinate) -> Result<String, LookupError> {
        self.find(coordinate)
            .map(|region| region.label.clone())
            .ok_or_else(|| LookupError::NoMatch(coordinate.clone()))
    }
}
