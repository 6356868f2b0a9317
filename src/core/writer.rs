use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata as ExifMetadata;
use little_exif::rational::uR64;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::extract::decimal_to_dms;
use crate::core::formats;
use crate::models::{Coordinate, OutputMode, PayloadImage, WriteOutcome};

/// Writes GPS EXIF fields into image files on disk.
pub struct GpsWriter;

impl GpsWriter {
    /// Writes every payload image that has a source path, in parallel.
    /// Outcomes come back in payload order.
    pub fn write_all(images: &[PayloadImage], output_mode: &OutputMode) -> Vec<WriteOutcome> {
        let mut indexed: Vec<(usize, WriteOutcome)> = images
            .par_iter()
            .enumerate()
            .map(|(index, image)| (index, Self::write_one(image, output_mode)))
            .collect();

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    fn write_one(image: &PayloadImage, output_mode: &OutputMode) -> WriteOutcome {
        let Some(source) = image.path.as_deref() else {
            return WriteOutcome::failure(&image.name, None, "no source file on disk");
        };
        let Some(location) = image.location.as_ref() else {
            return WriteOutcome::failure(&image.name, None, "image has no location");
        };

        let output = Self::output_path(source, &image.name, output_mode);
        match Self::write_location(source, &output, location) {
            Ok(()) => {
                debug!("wrote {location} into {}", output.display());
                WriteOutcome::success(&image.name, output)
            }
            Err(err) => {
                warn!("could not write GPS into {}: {err}", output.display());
                WriteOutcome::failure(&image.name, Some(output), err.to_string())
            }
        }
    }

    pub fn write_location(source: &Path, output: &Path, location: &Coordinate) -> io::Result<()> {
        if !source.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", source.display()),
            ));
        }

        if !formats::is_supported(source) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot write EXIF into {}", source.display()),
            ));
        }

        if source != output {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, output)?;
        }

        let mut exif = match ExifMetadata::new_from_path(output) {
            Ok(exif) => exif,
            Err(_) => ExifMetadata::new(),
        };
        set_gps_tags(&mut exif, location);
        exif.write_to_file(output)
    }

    pub fn output_path(source: &Path, name: &str, output_mode: &OutputMode) -> PathBuf {
        match output_mode {
            OutputMode::Overwrite => source.to_path_buf(),
            OutputMode::ExportTo(dir) => dir.join(name),
            OutputMode::Suffix(suffix) => Self::add_suffix(source, suffix),
        }
    }

    pub fn add_suffix(path: &Path, suffix: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("output"));

        let ext = path
            .extension()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_default();

        let file_name = if ext.is_empty() {
            format!("{stem}{suffix}")
        } else {
            format!("{stem}{suffix}.{ext}")
        };

        path.with_file_name(file_name)
    }
}

fn set_gps_tags(exif: &mut ExifMetadata, location: &Coordinate) {
    let lat_ref = if location.latitude() >= 0.0 { "N" } else { "S" };
    let lon_ref = if location.longitude() >= 0.0 { "E" } else { "W" };

    let (lat_d, lat_m, lat_sn, lat_sd) = decimal_to_dms(location.latitude());
    let (lon_d, lon_m, lon_sn, lon_sd) = decimal_to_dms(location.longitude());

    exif.set_tag(ExifTag::GPSLatitudeRef(lat_ref.to_string()));
    exif.set_tag(ExifTag::GPSLatitude(vec![
        ur64(lat_d, 1),
        ur64(lat_m, 1),
        ur64(lat_sn, lat_sd),
    ]));
    exif.set_tag(ExifTag::GPSLongitudeRef(lon_ref.to_string()));
    exif.set_tag(ExifTag::GPSLongitude(vec![
        ur64(lon_d, 1),
        ur64(lon_m, 1),
        ur64(lon_sn, lon_sd),
    ]));

    let altitude = location.altitude().unwrap_or(0.0);
    let alt_ref: u8 = if altitude < 0.0 { 1 } else { 0 };
    let alt_num = (altitude.abs() * 100.0).round() as u32;
    exif.set_tag(ExifTag::GPSAltitudeRef(vec![alt_ref]));
    exif.set_tag(ExifTag::GPSAltitude(vec![ur64(alt_num, 100)]));
}

fn ur64(nominator: u32, denominator: u32) -> uR64 {
    uR64 {
        nominator,
        denominator,
    }
}
