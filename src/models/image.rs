use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::formats;
use crate::models::Coordinate;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img_{}", self.0.simple())
    }
}

/// One candidate file handed to ingestion.
#[derive(Clone, Debug)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
    pub source_path: Option<PathBuf>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes,
            source_path: None,
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("unknown"));
        let mime_type = formats::detect_mime(path, &bytes);

        Ok(Self {
            name,
            mime_type,
            size_bytes: bytes.len() as u64,
            bytes,
            source_path: Some(path.to_path_buf()),
        })
    }

    pub fn is_image(&self) -> bool {
        formats::is_image_mime(&self.mime_type)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Extracted,
    Manual,
}

/// Where a record's location came from. `Stamped` is only left by removing the record.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LocationState {
    #[default]
    Empty,
    Extracted(Coordinate),
    Stamped(Coordinate),
}

impl LocationState {
    pub fn coordinate(&self) -> Option<&Coordinate> {
        match self {
            Self::Empty => None,
            Self::Extracted(coordinate) | Self::Stamped(coordinate) => Some(coordinate),
        }
    }

    pub fn source(&self) -> Option<LocationSource> {
        match self {
            Self::Empty => None,
            Self::Extracted(_) => Some(LocationSource::Extracted),
            Self::Stamped(_) => Some(LocationSource::Manual),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub source_path: Option<PathBuf>,
    pub ingested_at: DateTime<Utc>,
    location: LocationState,
}

impl ImageRecord {
    pub fn from_raw(raw: RawFile, extracted: Option<Coordinate>) -> Self {
        let location = match extracted {
            Some(coordinate) => LocationState::Extracted(coordinate),
            None => LocationState::Empty,
        };

        Self {
            id: ImageId::new(),
            name: raw.name,
            size_bytes: raw.size_bytes,
            mime_type: raw.mime_type,
            content: raw.bytes,
            source_path: raw.source_path,
            ingested_at: Utc::now(),
            location,
        }
    }

    pub fn location(&self) -> Option<&Coordinate> {
        self.location.coordinate()
    }

    pub fn location_source(&self) -> Option<LocationSource> {
        self.location.source()
    }

    pub fn location_state(&self) -> &LocationState {
        &self.location
    }

    pub(crate) fn stamp(&mut self, coordinate: Coordinate) {
        self.location = LocationState::Stamped(coordinate);
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return String::from("0 Bytes");
    }

    let mut exponent = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && exponent < UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }

    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{rounded} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_use_binary_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }

    #[test]
    fn ids_display_with_prefix() {
        let id = ImageId::new();

        assert!(id.to_string().starts_with("img_"));
        assert_ne!(id, ImageId::new());
    }

    #[test]
    fn raw_file_from_path_sniffs_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("photo.dat");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']).unwrap();

        let raw = RawFile::from_path(&path).unwrap();

        assert_eq!(raw.name, "photo.dat");
        assert_eq!(raw.mime_type, "image/jpeg");
        assert_eq!(raw.size_bytes, 10);
        assert_eq!(raw.source_path.as_deref(), Some(path.as_path()));
        assert!(raw.is_image());
    }
}
