//! Tests for the route model and the encoded-polyline codec

use navtrack::{
    decode_polyline6, encode_polyline6, GpsPoint, Maneuver, NavError, RouteGeometry, RouteModel,
};

fn turn(begin_index: usize) -> Maneuver {
    Maneuver {
        instruction: "Turn".to_string(),
        begin_index,
        end_index: None,
        length_m: 10.0,
    }
}

fn three_points() -> Vec<GpsPoint> {
    vec![
        GpsPoint::new(47.3769, 8.5417),
        GpsPoint::new(47.3779, 8.5417),
        GpsPoint::new(47.3789, 8.5427),
    ]
}

// ========================================================================
// Model validation
// ========================================================================

#[test]
fn test_degenerate_route_rejected() {
    let result = RouteModel::new(vec![GpsPoint::new(47.0, 8.0)], vec![]);
    assert!(matches!(
        result,
        Err(NavError::DegenerateRoute { point_count: 1, .. })
    ));

    assert!(matches!(
        RouteModel::new(vec![], vec![]),
        Err(NavError::DegenerateRoute { point_count: 0, .. })
    ));
}

#[test]
fn test_unsorted_maneuvers_rejected() {
    let result = RouteModel::new(three_points(), vec![turn(2), turn(1)]);
    assert!(matches!(
        result,
        Err(NavError::UnsortedManeuvers {
            index: 1,
            begin_index: 1,
            previous: 2,
        })
    ));
}

#[test]
fn test_maneuver_out_of_bounds_rejected() {
    let result = RouteModel::new(three_points(), vec![turn(3)]);
    assert!(matches!(
        result,
        Err(NavError::ManeuverOutOfBounds {
            index: 0,
            begin_index: 3,
            vertex_count: 3,
        })
    ));
}

#[test]
fn test_equal_begin_indices_are_valid() {
    // Two instructions anchored at the same vertex (e.g. depart + turn).
    let model = RouteModel::new(three_points(), vec![turn(1), turn(1)]);
    assert!(model.is_ok());
}

#[test]
fn test_destination_is_last_vertex() {
    let points = three_points();
    let last = points[2];
    let model = RouteModel::new(points, vec![]).unwrap();
    assert_eq!(model.destination(), last);
}

#[test]
fn test_geometry_into_model_validates() {
    let geometry = RouteGeometry {
        points: three_points(),
        maneuvers: vec![turn(5)],
    };
    assert!(geometry.into_model().is_err());
}

// ========================================================================
// Encoded polyline, precision 6
// ========================================================================

#[test]
fn test_polyline6_round_trip() {
    let points = vec![
        GpsPoint::new(47.376900, 8.541700),
        GpsPoint::new(47.377123, 8.541234),
        GpsPoint::new(-33.865143, 151.209900),
        GpsPoint::new(0.000001, -0.000001),
    ];

    let encoded = encode_polyline6(&points);
    let decoded = decode_polyline6(&encoded).unwrap();

    assert_eq!(decoded.len(), points.len());
    for (original, round_tripped) in points.iter().zip(&decoded) {
        // Precision 6 quantizes to 1e-6 degrees.
        assert!((original.latitude - round_tripped.latitude).abs() < 1e-6);
        assert!((original.longitude - round_tripped.longitude).abs() < 1e-6);
    }
}

#[test]
fn test_polyline6_empty_shape() {
    assert_eq!(decode_polyline6("").unwrap(), vec![]);
}

#[test]
fn test_polyline6_truncated_shape_is_an_error() {
    // '_' has the continuation bit set, so a shape ending on it is cut off.
    let result = decode_polyline6("_");
    assert!(matches!(result, Err(NavError::InvalidShape { .. })));

    // Chopping the last byte off a valid shape must also fail or decode
    // fewer points, never panic.
    let encoded = encode_polyline6(&three_points());
    let truncated = &encoded[..encoded.len() - 1];
    match decode_polyline6(truncated) {
        Ok(points) => assert!(points.len() < 3),
        Err(NavError::InvalidShape { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_polyline6_rejects_out_of_range_bytes() {
    // Bytes below 63 can never appear in a valid shape.
    let result = decode_polyline6(" ");
    assert!(matches!(result, Err(NavError::InvalidShape { .. })));
}
