use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata as ExifMetadata;
use little_exif::rational::uR64;
use tracing::debug;

use crate::core::formats;
use crate::models::Coordinate;

/// Reads a position out of an image blob.
///
/// Implementations never fail: unreadable metadata, missing GPS fields and
/// out-of-range values all come back as `None`.
pub trait GeoExtractor: Send + Sync {
    fn extract(&self, blob: &[u8]) -> Option<Coordinate>;
}

/// A latitude or longitude magnitude as stored in the source metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GpsComponent {
    Dms {
        degrees: f64,
        minutes: f64,
        seconds: f64,
    },
    Decimal(f64),
}

impl GpsComponent {
    pub fn to_degrees(self) -> f64 {
        match self {
            Self::Dms {
                degrees,
                minutes,
                seconds,
            } => dms_to_decimal(degrees, minutes, seconds),
            Self::Decimal(value) => value,
        }
    }

    fn from_rationals(values: &[uR64]) -> Option<Self> {
        let parts: Vec<f64> = values.iter().map(rational_to_f64).collect();

        match parts.as_slice() {
            [] => None,
            [decimal] => Some(Self::Decimal(*decimal)),
            [degrees, minutes] => Some(Self::Dms {
                degrees: *degrees,
                minutes: *minutes,
                seconds: 0.0,
            }),
            [degrees, minutes, seconds, ..] => Some(Self::Dms {
                degrees: *degrees,
                minutes: *minutes,
                seconds: *seconds,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn from_ref(value: &str) -> Option<Self> {
        match value.trim_end_matches('\0').trim().to_ascii_uppercase().as_str() {
            "N" => Some(Self::North),
            "S" => Some(Self::South),
            "E" => Some(Self::East),
            "W" => Some(Self::West),
            _ => None,
        }
    }

    fn apply(self, value: f64) -> f64 {
        match self {
            Self::South | Self::West => -value.abs(),
            Self::North | Self::East => value,
        }
    }
}

/// Every GPS-related field the extractor looks at, each independently optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGps {
    pub latitude: Option<GpsComponent>,
    pub latitude_ref: Option<Hemisphere>,
    pub longitude: Option<GpsComponent>,
    pub longitude_ref: Option<Hemisphere>,
    pub altitude: Option<f64>,
    pub below_sea_level: bool,
    pub gps_date: Option<String>,
    pub gps_time: Option<(f64, f64, f64)>,
    pub capture_time: Option<String>,
    pub flat_latitude: Option<f64>,
    pub flat_longitude: Option<f64>,
}

impl RawGps {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.flat_latitude.is_none()
            && self.flat_longitude.is_none()
    }

    /// Turns the sparse fields into a validated coordinate.
    ///
    /// The composite GPS pair wins over the flat pair. A flat pair with one
    /// side missing uses 0 for that side. Out-of-range results are dropped.
    pub fn resolve(&self) -> Option<Coordinate> {
        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                let mut latitude = latitude.to_degrees();
                let mut longitude = longitude.to_degrees();

                if let Some(hemisphere) = self.latitude_ref {
                    latitude = hemisphere.apply(latitude);
                }
                if let Some(hemisphere) = self.longitude_ref {
                    longitude = hemisphere.apply(longitude);
                }

                (latitude, longitude)
            }
            _ if self.flat_latitude.is_some() || self.flat_longitude.is_some() => (
                self.flat_latitude.unwrap_or(0.0),
                self.flat_longitude.unwrap_or(0.0),
            ),
            _ => return None,
        };

        let coordinate = match Coordinate::new(latitude, longitude) {
            Ok(coordinate) => coordinate,
            Err(err) => {
                debug!("discarding embedded location: {err}");
                return None;
            }
        };

        let altitude = self
            .altitude
            .map(|value| if self.below_sea_level { -value } else { value });

        Some(
            coordinate
                .with_altitude(altitude)
                .with_captured_at(self.timestamp()),
        )
    }

    fn timestamp(&self) -> Option<String> {
        let gps = match (&self.gps_date, self.gps_time) {
            (Some(date), Some((hours, minutes, seconds))) => Some(format!(
                "{date} {:02}:{:02}:{:02}",
                hours as u32, minutes as u32, seconds as u32
            )),
            (Some(date), None) => Some(date.clone()),
            (None, _) => None,
        };

        gps.or_else(|| self.capture_time.clone())
    }
}

/// EXIF/XMP backed extractor.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifGeoExtractor;

impl ExifGeoExtractor {
    pub fn read_path(path: &Path) -> io::Result<Option<Coordinate>> {
        let bytes = fs::read(path)?;
        Ok(Self.extract(&bytes))
    }

    /// Collects the raw GPS fields without interpreting them.
    pub fn read(blob: &[u8]) -> RawGps {
        let mut raw = RawGps::default();

        if let Some(exif) = load_exif(blob) {
            fill_from_exif(&mut raw, &exif);
        }
        fill_from_xmp(&mut raw, blob);

        raw
    }
}

impl GeoExtractor for ExifGeoExtractor {
    fn extract(&self, blob: &[u8]) -> Option<Coordinate> {
        // little_exif can panic on truncated containers
        let raw = match panic::catch_unwind(AssertUnwindSafe(|| Self::read(blob))) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("metadata parser panicked, treating blob as unlocated");
                return None;
            }
        };

        if raw.is_empty() {
            debug!("no GPS fields in {} byte blob", blob.len());
            return None;
        }

        raw.resolve()
    }
}

fn load_exif(blob: &[u8]) -> Option<ExifMetadata> {
    let container = formats::exif_container(blob)?;
    match ExifMetadata::new_from_vec(&blob.to_vec(), container) {
        Ok(exif) => Some(exif),
        Err(err) => {
            debug!("unreadable EXIF block: {err}");
            None
        }
    }
}

fn fill_from_exif(raw: &mut RawGps, exif: &ExifMetadata) {
    let mut date_time_original = None;
    let mut create_date = None;
    let mut modify_date = None;

    for tag in exif {
        match tag {
            ExifTag::GPSLatitudeRef(s) => raw.latitude_ref = Hemisphere::from_ref(s),
            ExifTag::GPSLatitude(rats) => raw.latitude = GpsComponent::from_rationals(rats),
            ExifTag::GPSLongitudeRef(s) => raw.longitude_ref = Hemisphere::from_ref(s),
            ExifTag::GPSLongitude(rats) => raw.longitude = GpsComponent::from_rationals(rats),
            ExifTag::GPSAltitudeRef(bytes) if !bytes.is_empty() => {
                raw.below_sea_level = bytes[0] == 1;
            }
            ExifTag::GPSAltitude(rats) if !rats.is_empty() => {
                raw.altitude = Some(rational_to_f64(&rats[0]));
            }
            ExifTag::GPSTimeStamp(rats) if rats.len() >= 3 => {
                raw.gps_time = Some((
                    rational_to_f64(&rats[0]),
                    rational_to_f64(&rats[1]),
                    rational_to_f64(&rats[2]),
                ));
            }
            ExifTag::GPSDateStamp(s) => raw.gps_date = non_empty(s),
            ExifTag::DateTimeOriginal(s) => date_time_original = non_empty(s),
            ExifTag::CreateDate(s) => create_date = non_empty(s),
            ExifTag::ModifyDate(s) => modify_date = non_empty(s),
            _ => {}
        }
    }

    raw.capture_time = date_time_original.or(create_date).or(modify_date);
}

// DJI and some phone apps put plain decimal degrees into XMP instead of EXIF.
const XMP_LATITUDE_KEYS: &[&str] = &["GpsLatitude", "GPSLatitudeDecimal", "Latitude"];
const XMP_LONGITUDE_KEYS: &[&str] = &["GpsLongitude", "GPSLongitudeDecimal", "Longitude"];

fn fill_from_xmp(raw: &mut RawGps, blob: &[u8]) {
    let Some(packet) = xmp_packet(blob) else {
        return;
    };

    raw.flat_latitude = XMP_LATITUDE_KEYS
        .iter()
        .find_map(|key| xmp_decimal(packet, key));
    raw.flat_longitude = XMP_LONGITUDE_KEYS
        .iter()
        .find_map(|key| xmp_decimal(packet, key));
}

fn xmp_packet(blob: &[u8]) -> Option<&str> {
    const OPEN: &[u8] = b"<x:xmpmeta";
    const CLOSE: &[u8] = b"</x:xmpmeta>";

    let start = find_bytes(blob, OPEN)?;
    let end = find_bytes(&blob[start..], CLOSE)? + start + CLOSE.len();
    std::str::from_utf8(&blob[start..end]).ok()
}

/// Finds `prefix:Key="value"` or `<prefix:Key>value<` and parses a decimal.
fn xmp_decimal(packet: &str, key: &str) -> Option<f64> {
    let attribute = format!(":{key}=\"");
    if let Some(position) = packet.find(&attribute) {
        let rest = &packet[position + attribute.len()..];
        let value = rest.split('"').next()?;
        return value.trim().parse::<f64>().ok();
    }

    let element = format!(":{key}>");
    let position = packet.find(&element)?;
    let rest = &packet[position + element.len()..];
    let value = rest.split('<').next()?;
    value.trim().parse::<f64>().ok()
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn non_empty(value: &str) -> Option<String> {
    let cleaned = value.trim_end_matches('\0').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn rational_to_f64(value: &uR64) -> f64 {
    if value.denominator == 0 {
        return f64::NAN;
    }
    value.nominator as f64 / value.denominator as f64
}

const SECONDS_DENOMINATOR: u32 = 10_000;

/// Splits an unsigned magnitude into whole degrees, whole minutes and
/// seconds as `numerator / denominator`, the layout EXIF GPS rationals use.
pub fn decimal_to_dms(decimal: f64) -> (u32, u32, u32, u32) {
    let magnitude = decimal.abs();
    let whole_degrees = magnitude.trunc();
    let total_minutes = (magnitude - whole_degrees) * 60.0;
    let whole_minutes = total_minutes.trunc();
    let seconds = (total_minutes - whole_minutes) * 60.0;

    (
        whole_degrees as u32,
        whole_minutes as u32,
        (seconds * f64::from(SECONDS_DENOMINATOR)).round() as u32,
        SECONDS_DENOMINATOR,
    )
}

pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
