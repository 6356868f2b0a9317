use std::fs;

use geostamp::core::extract::{
    decimal_to_dms, dms_to_decimal, ExifGeoExtractor, GeoExtractor, GpsComponent, Hemisphere,
    RawGps,
};
use image::{ImageFormat, Rgb, RgbImage};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use tempfile::TempDir;

fn dms(degrees: f64, minutes: f64, seconds: f64) -> Option<GpsComponent> {
    Some(GpsComponent::Dms {
        degrees,
        minutes,
        seconds,
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn dms_north_east_resolves_to_positive_decimal() {
    let raw = RawGps {
        latitude: dms(39.0, 54.0, 15.12),
        latitude_ref: Some(Hemisphere::North),
        longitude: dms(116.0, 24.0, 26.64),
        longitude_ref: Some(Hemisphere::East),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert!(close(coordinate.latitude(), 39.9042));
    assert!(close(coordinate.longitude(), 116.4074));
    assert_eq!(coordinate.altitude(), None);
}

#[test]
fn south_and_west_references_negate() {
    let raw = RawGps {
        latitude: dms(33.0, 51.0, 54.0),
        latitude_ref: Some(Hemisphere::South),
        longitude: dms(151.0, 12.0, 36.0),
        longitude_ref: Some(Hemisphere::West),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert!(close(coordinate.latitude(), -33.865));
    assert!(close(coordinate.longitude(), -151.21));
}

#[test]
fn decimal_component_with_south_reference_is_negated_once() {
    let raw = RawGps {
        latitude: Some(GpsComponent::Decimal(-12.5)),
        latitude_ref: Some(Hemisphere::South),
        longitude: Some(GpsComponent::Decimal(45.25)),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert!(close(coordinate.latitude(), -12.5));
    assert!(close(coordinate.longitude(), 45.25));
}

#[test]
fn composite_pair_wins_over_flat_pair() {
    let raw = RawGps {
        latitude: Some(GpsComponent::Decimal(10.0)),
        longitude: Some(GpsComponent::Decimal(20.0)),
        flat_latitude: Some(30.0),
        flat_longitude: Some(40.0),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert_eq!((coordinate.latitude(), coordinate.longitude()), (10.0, 20.0));
}

#[test]
fn flat_pair_defaults_missing_side_to_zero() {
    let raw = RawGps {
        flat_latitude: Some(31.2304),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert_eq!((coordinate.latitude(), coordinate.longitude()), (31.2304, 0.0));
}

#[test]
fn lone_composite_latitude_falls_back_to_flat_pair() {
    let raw = RawGps {
        latitude: dms(10.0, 0.0, 0.0),
        flat_longitude: Some(5.0),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert_eq!((coordinate.latitude(), coordinate.longitude()), (0.0, 5.0));
}

#[test]
fn out_of_range_values_resolve_to_none() {
    let raw = RawGps {
        latitude: Some(GpsComponent::Decimal(91.0)),
        longitude: Some(GpsComponent::Decimal(10.0)),
        ..RawGps::default()
    };
    assert_eq!(raw.resolve(), None);

    let raw = RawGps {
        flat_latitude: Some(10.0),
        flat_longitude: Some(-180.5),
        ..RawGps::default()
    };
    assert_eq!(raw.resolve(), None);
}

#[test]
fn zero_denominator_rational_resolves_to_none() {
    let raw = RawGps {
        latitude: Some(GpsComponent::Decimal(f64::NAN)),
        longitude: Some(GpsComponent::Decimal(10.0)),
        ..RawGps::default()
    };

    assert_eq!(raw.resolve(), None);
}

#[test]
fn no_fields_resolves_to_none() {
    let raw = RawGps {
        altitude: Some(120.0),
        gps_date: Some(String::from("2024:05:01")),
        ..RawGps::default()
    };

    assert!(raw.is_empty());
    assert_eq!(raw.resolve(), None);
}

#[test]
fn altitude_below_sea_level_is_negative_and_rounded() {
    let raw = RawGps {
        latitude: Some(GpsComponent::Decimal(31.5)),
        longitude: Some(GpsComponent::Decimal(35.5)),
        altitude: Some(430.456),
        below_sea_level: true,
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");

    assert_eq!(coordinate.altitude(), Some(-430.46));
}

#[test]
fn timestamp_prefers_gps_date_and_time_over_capture_time() {
    let mut raw = RawGps {
        latitude: Some(GpsComponent::Decimal(1.0)),
        longitude: Some(GpsComponent::Decimal(2.0)),
        gps_date: Some(String::from("2024:05:01")),
        gps_time: Some((8.0, 5.0, 9.0)),
        capture_time: Some(String::from("2024:05:01 16:05:09")),
        ..RawGps::default()
    };

    let coordinate = raw.resolve().expect("should resolve");
    assert_eq!(coordinate.captured_at(), Some("2024:05:01 08:05:09"));

    raw.gps_time = None;
    let coordinate = raw.resolve().expect("should resolve");
    assert_eq!(coordinate.captured_at(), Some("2024:05:01"));

    raw.gps_date = None;
    let coordinate = raw.resolve().expect("should resolve");
    assert_eq!(coordinate.captured_at(), Some("2024:05:01 16:05:09"));
}

#[test]
fn hemisphere_reference_parsing() {
    assert_eq!(Hemisphere::from_ref("N"), Some(Hemisphere::North));
    assert_eq!(Hemisphere::from_ref("s\0"), Some(Hemisphere::South));
    assert_eq!(Hemisphere::from_ref(" W "), Some(Hemisphere::West));
    assert_eq!(Hemisphere::from_ref("X"), None);
}

#[test]
fn garbage_bytes_have_no_location() {
    let extractor = ExifGeoExtractor;

    assert_eq!(extractor.extract(b""), None);
    assert_eq!(extractor.extract(b"definitely not an image"), None);
    assert_eq!(extractor.extract(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00]), None);
}

#[test]
fn xmp_decimal_keys_are_read_as_flat_pair() {
    let blob = br#"junk<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:Description
        drone-dji:GpsLatitude="+31.230400"
        drone-dji:GpsLongitude="+121.473700"/></x:xmpmeta>trailer"#;

    let raw = ExifGeoExtractor::read(blob);
    assert_eq!(raw.flat_latitude, Some(31.2304));
    assert_eq!(raw.flat_longitude, Some(121.4737));

    let coordinate = ExifGeoExtractor.extract(blob).expect("should resolve");
    assert_eq!((coordinate.latitude(), coordinate.longitude()), (31.2304, 121.4737));
}

#[test]
fn xmp_element_form_is_read() {
    let blob = b"<x:xmpmeta><exif:GPSLatitudeDecimal>-8.65</exif:GPSLatitudeDecimal>\
<exif:GPSLongitudeDecimal>115.2167</exif:GPSLongitudeDecimal></x:xmpmeta>";

    let coordinate = ExifGeoExtractor.extract(blob).expect("should resolve");

    assert_eq!((coordinate.latitude(), coordinate.longitude()), (-8.65, 115.2167));
}

#[test]
fn dms_conversion_helpers_agree() {
    let (degrees, minutes, seconds, denominator) = decimal_to_dms(39.9042);

    assert_eq!((degrees, minutes, denominator), (39, 54, 10000));
    let back = dms_to_decimal(
        degrees as f64,
        minutes as f64,
        seconds as f64 / denominator as f64,
    );
    assert!((back - 39.9042).abs() < 1e-6);
}

fn rational(nominator: u32, denominator: u32) -> uR64 {
    uR64 {
        nominator,
        denominator,
    }
}

#[test]
fn south_west_exif_rationals_read_back_negative() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("santiago.jpg");
    RgbImage::from_pixel(16, 16, Rgb([90, 140, 60]))
        .save_with_format(&path, ImageFormat::Jpeg)
        .expect("should write jpeg");

    // 33 26' 56.04" S, 70 40' 9.48" W
    let mut exif = Metadata::new();
    exif.set_tag(ExifTag::GPSLatitudeRef(String::from("S")));
    exif.set_tag(ExifTag::GPSLatitude(vec![
        rational(33, 1),
        rational(26, 1),
        rational(560_400, 10_000),
    ]));
    exif.set_tag(ExifTag::GPSLongitudeRef(String::from("W")));
    exif.set_tag(ExifTag::GPSLongitude(vec![
        rational(70, 1),
        rational(40, 1),
        rational(94_800, 10_000),
    ]));
    exif.write_to_file(&path).expect("should write exif");

    let bytes = fs::read(&path).expect("should read jpeg");
    let raw = ExifGeoExtractor::read(&bytes);
    assert_eq!(raw.latitude_ref, Some(Hemisphere::South));
    assert_eq!(raw.longitude_ref, Some(Hemisphere::West));

    let coordinate = ExifGeoExtractor.extract(&bytes).expect("should resolve");
    assert!(close(coordinate.latitude(), -33.4489));
    assert!(close(coordinate.longitude(), -70.6693));
    assert_eq!(coordinate.altitude(), None);
}
