use geostamp::core::projection::{MapProjection, ProjectionError};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn centre_of_surface_maps_to_configured_centre() {
    let projection = MapProjection::default();

    let coordinate = projection.project(400.0, 300.0, 800.0, 600.0);

    assert_eq!(coordinate.latitude(), 39.9042);
    assert_eq!(coordinate.longitude(), 116.4074);
    assert_eq!(coordinate.altitude(), None);
}

#[test]
fn corners_map_to_box_edges() {
    let projection = MapProjection::default();

    let top_left = projection.project(0.0, 0.0, 800.0, 600.0);
    assert!(close(top_left.latitude(), 39.8542));
    assert!(close(top_left.longitude(), 116.3574));

    let bottom_right = projection.project(800.0, 600.0, 800.0, 600.0);
    assert!(close(bottom_right.latitude(), 39.9542));
    assert!(close(bottom_right.longitude(), 116.4574));
}

#[test]
fn results_are_rounded_to_six_places() {
    let projection = MapProjection::default();

    let coordinate = projection.project(1.0, 1.0, 3.0, 7.0);

    for value in [coordinate.latitude(), coordinate.longitude()] {
        let scaled = value * 1e6;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}

#[test]
fn picks_outside_the_surface_are_clamped() {
    let projection = MapProjection::default();

    let outside = projection.project(-50.0, 900.0, 800.0, 600.0);
    let edge = projection.project(0.0, 600.0, 800.0, 600.0);

    assert_eq!(outside, edge);
}

#[test]
fn empty_surface_maps_to_centre() {
    let projection = MapProjection::default();

    let coordinate = projection.project(10.0, 10.0, 0.0, 0.0);

    assert_eq!(
        (coordinate.latitude(), coordinate.longitude()),
        projection.center()
    );
}

#[test]
fn custom_box_is_honoured() {
    let projection = MapProjection::new(31.2304, 121.4737, 0.2, 0.4).expect("valid box");

    let coordinate = projection.project(100.0, 25.0, 100.0, 100.0);

    assert!(close(coordinate.latitude(), 31.1804));
    assert!(close(coordinate.longitude(), 121.6737));
}

#[test]
fn invalid_boxes_are_rejected() {
    assert_eq!(
        MapProjection::new(0.0, 0.0, 0.0, 1.0),
        Err(ProjectionError::InvalidSpan(0.0))
    );
    assert_eq!(
        MapProjection::new(0.0, 0.0, 1.0, f64::INFINITY),
        Err(ProjectionError::InvalidSpan(f64::INFINITY))
    );
    assert_eq!(
        MapProjection::new(89.9, 0.0, 1.0, 1.0),
        Err(ProjectionError::OutOfBounds)
    );
    assert_eq!(
        MapProjection::new(0.0, -179.8, 1.0, 1.0),
        Err(ProjectionError::OutOfBounds)
    );
}
