use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, ImageId, LocationSource};

pub const EXPORT_VERSION: &str = "1.0";

/// One image as it stood when a commit was applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: ImageId,
    pub name: String,
    pub location: Option<Coordinate>,
    pub ingested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

/// Owned copy of the batch returned by a successful commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub images: Vec<SnapshotEntry>,
    pub committed_at: DateTime<Utc>,
}

impl BatchSnapshot {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn payload(&self) -> SinkPayload {
        SinkPayload {
            images: self
                .images
                .iter()
                .map(|entry| PayloadImage {
                    name: entry.name.clone(),
                    location: entry.location.clone(),
                    timestamp: entry.ingested_at,
                    path: entry.source_path.clone(),
                })
                .collect(),
            timestamp: self.committed_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadImage {
    pub name: String,
    pub location: Option<Coordinate>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// What a persistence sink receives for each commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinkPayload {
    pub images: Vec<PayloadImage>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchStatus {
    pub images_count: usize,
    pub has_location: bool,
    pub selected_location: Option<Coordinate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportMetadata {
    pub export_time: DateTime<Utc>,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportedImage {
    pub id: ImageId,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub location: Option<Coordinate>,
    pub location_source: Option<LocationSource>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchExport {
    pub metadata: ExportMetadata,
    pub images: Vec<ExportedImage>,
}
