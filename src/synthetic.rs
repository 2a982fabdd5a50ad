//! Synthetic route and fix generation for tests and tooling.
//!
//! Provides ground-truth scenarios for the state machine: routes with known
//! vertex spacing and fix streams at controlled lateral offsets, with
//! optional seeded GPS noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo_utils::cumulative_distances;
use crate::{GpsPoint, LocationFix};

/// Meters per degree of latitude (spherical approximation).
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Displace a point by `distance_m` along `bearing_deg` (planar
/// approximation, adequate below a few kilometers).
pub fn offset_point(origin: GpsPoint, bearing_deg: f64, distance_m: f64) -> GpsPoint {
    let bearing = bearing_deg.to_radians();
    let d_north = distance_m * bearing.cos();
    let d_east = distance_m * bearing.sin();

    let d_lat = d_north / METERS_PER_DEGREE_LAT;
    let d_lon = d_east / (METERS_PER_DEGREE_LAT * origin.latitude.to_radians().cos());

    GpsPoint::new(origin.latitude + d_lat, origin.longitude + d_lon)
}

/// Straight polyline from `origin` along `bearing_deg`, vertices every
/// `spacing_m` until `length_m` is covered.
pub fn straight_route(
    origin: GpsPoint,
    bearing_deg: f64,
    length_m: f64,
    spacing_m: f64,
) -> Vec<GpsPoint> {
    let count = (length_m / spacing_m).round() as usize;
    (0..=count)
        .map(|i| offset_point(origin, bearing_deg, i as f64 * spacing_m))
        .collect()
}

/// A stream of fixes walking a route at fixed spacing, each displaced
/// perpendicular to the local route direction by `lateral_offset_m` plus
/// seeded Gaussian-ish noise.
pub struct FixStreamConfig {
    /// Spacing between consecutive fixes along the route.
    pub spacing_m: f64,
    /// Perpendicular displacement applied to every fix.
    pub lateral_offset_m: f64,
    /// Uniform noise amplitude added on top of the offset (0 disables).
    pub noise_m: f64,
    /// Reported horizontal accuracy.
    pub accuracy_m: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for FixStreamConfig {
    fn default() -> Self {
        Self {
            spacing_m: 20.0,
            lateral_offset_m: 0.0,
            noise_m: 0.0,
            accuracy_m: 8.0,
            seed: 42,
        }
    }
}

/// Generate fixes walking `route` start to end per `config`, one second
/// apart starting at `start_ms`.
pub fn fixes_along(route: &[GpsPoint], start_ms: i64, config: &FixStreamConfig) -> Vec<LocationFix> {
    if route.len() < 2 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let cumulative = cumulative_distances(route);
    let total = *cumulative.last().unwrap_or(&0.0);
    if total <= 0.0 {
        return Vec::new();
    }

    let steps = (total / config.spacing_m).floor() as usize;
    let mut fixes = Vec::with_capacity(steps + 1);

    for step in 0..=steps {
        let target = (step as f64 * config.spacing_m).min(total);

        // Find the segment containing the target distance.
        let mut seg = 0;
        while seg + 1 < cumulative.len() - 1 && cumulative[seg + 1] < target {
            seg += 1;
        }
        let seg_len = cumulative[seg + 1] - cumulative[seg];
        let ratio = if seg_len > 0.0 {
            (target - cumulative[seg]) / seg_len
        } else {
            0.0
        };

        let a = route[seg];
        let b = route[seg + 1];
        let on_route = GpsPoint::new(
            a.latitude + ratio * (b.latitude - a.latitude),
            a.longitude + ratio * (b.longitude - a.longitude),
        );

        // Perpendicular to the segment direction.
        let seg_bearing = segment_bearing(&a, &b);
        let noise = if config.noise_m > 0.0 {
            rng.gen_range(-config.noise_m..config.noise_m)
        } else {
            0.0
        };
        let displaced = offset_point(
            on_route,
            seg_bearing + 90.0,
            config.lateral_offset_m + noise,
        );

        fixes.push(LocationFix::new(
            displaced.latitude,
            displaced.longitude,
            config.accuracy_m,
            start_ms + step as i64 * 1000,
        ));
    }

    fixes
}

fn segment_bearing(a: &GpsPoint, b: &GpsPoint) -> f64 {
    crate::geo_utils::bearing_degrees(a, b).unwrap_or(0.0)
}
