//! Geometry kernel: great-circle distance, bearing, polyline projection and
//! path-length accumulation.
//!
//! All functions are pure and operate on [`GpsPoint`] values. Distances are
//! meters, bearings are degrees clockwise from north.

use crate::GpsPoint;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Result of projecting a point onto a route polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineProjection {
    /// The closest point on the polyline.
    pub snapped: GpsPoint,
    /// Index of the starting vertex of the segment the point snapped to.
    pub segment_index: usize,
    /// Perpendicular distance from the query point to the snapped point.
    pub lateral_distance_m: f64,
    /// Cumulative distance from the polyline start to the snapped point.
    pub distance_along_m: f64,
}

/// Great-circle distance between two coordinates in meters (haversine).
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees, normalized to `[0, 360)`.
///
/// Returns `None` when the points coincide (bearing is undefined).
pub fn bearing_degrees(a: &GpsPoint, b: &GpsPoint) -> Option<f64> {
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return None;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let bearing = y.atan2(x).to_degrees();

    Some((bearing + 360.0) % 360.0)
}

/// Project a point onto every segment of `vertices` and return the globally
/// closest projection.
///
/// Tie-break: when two segments yield equal minimal distance, the later
/// (higher-index) segment wins. This avoids spurious backward snapping on
/// self-intersecting or near-parallel route segments.
///
/// Contract: `vertices.len() >= 2`. Shorter polylines are a caller error.
pub fn nearest_point_on_polyline(point: &GpsPoint, vertices: &[GpsPoint]) -> PolylineProjection {
    assert!(
        vertices.len() >= 2,
        "nearest_point_on_polyline requires at least 2 vertices"
    );

    let mut best_snapped = vertices[0];
    let mut best_index = 0;
    let mut best_distance = f64::INFINITY;
    let mut best_along = 0.0;

    let mut along = 0.0;
    for (i, pair) in vertices.windows(2).enumerate() {
        let snapped = project_onto_segment(point, &pair[0], &pair[1]);
        let d = haversine_distance(point, &snapped);

        // <= keeps the later segment on exact ties.
        if d <= best_distance {
            best_distance = d;
            best_snapped = snapped;
            best_index = i;
            best_along = along + haversine_distance(&pair[0], &snapped);
        }

        along += haversine_distance(&pair[0], &pair[1]);
    }

    PolylineProjection {
        snapped: best_snapped,
        segment_index: best_index,
        lateral_distance_m: best_distance,
        distance_along_m: best_along,
    }
}

/// Sum of consecutive segment lengths over the inclusive index range
/// `[from_index, to_index]`.
///
/// Indices outside the polyline are clamped to the last vertex; an inverted
/// or empty range yields `0.0`.
pub fn path_length(vertices: &[GpsPoint], from_index: usize, to_index: usize) -> f64 {
    if vertices.len() < 2 || to_index <= from_index {
        return 0.0;
    }
    let from = from_index.min(vertices.len() - 1);
    let to = to_index.min(vertices.len() - 1);

    vertices[from..=to]
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Cumulative distances along a polyline; `result[i]` is the distance from
/// the first vertex to vertex `i`.
pub fn cumulative_distances(vertices: &[GpsPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(vertices.len());
    distances.push(0.0);

    for i in 1..vertices.len() {
        let prev = distances[i - 1];
        distances.push(prev + haversine_distance(&vertices[i - 1], &vertices[i]));
    }

    distances
}

/// Total length of a polyline in meters.
pub fn polyline_length(vertices: &[GpsPoint]) -> f64 {
    vertices
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Project `point` onto the segment `a -> b` using a local equirectangular
/// plane anchored at `a`.
///
/// At GPS-fix scales (tens to hundreds of meters) the planar approximation
/// error is far below GPS accuracy.
fn project_onto_segment(point: &GpsPoint, a: &GpsPoint, b: &GpsPoint) -> GpsPoint {
    let (px, py) = to_local_meters(point, a);
    let (bx, by) = to_local_meters(b, a);

    let seg_len_sq = bx * bx + by * by;
    if seg_len_sq == 0.0 {
        return *a;
    }

    let t = ((px * bx + py * by) / seg_len_sq).clamp(0.0, 1.0);
    from_local_meters(bx * t, by * t, a)
}

fn to_local_meters(point: &GpsPoint, origin: &GpsPoint) -> (f64, f64) {
    let d_lat = (point.latitude - origin.latitude).to_radians();
    let d_lon = (point.longitude - origin.longitude).to_radians();
    let x = EARTH_RADIUS_M * d_lon * origin.latitude.to_radians().cos();
    let y = EARTH_RADIUS_M * d_lat;
    (x, y)
}

fn from_local_meters(x: f64, y: f64, origin: &GpsPoint) -> GpsPoint {
    let d_lat = y / EARTH_RADIUS_M;
    let d_lon = x / (EARTH_RADIUS_M * origin.latitude.to_radians().cos());
    GpsPoint::new(
        origin.latitude + d_lat.to_degrees(),
        origin.longitude + d_lon.to_degrees(),
    )
}
