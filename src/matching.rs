//! Map-matcher: snaps a location fix onto the active route and enforces
//! route-progress monotonicity.
//!
//! The agent cannot un-walk the route: if a projection lands on an earlier
//! segment than the session has already reached (self-overlapping routes,
//! GPS noise near parallel segments), only the progress index is clamped.
//! The snapped lateral position always comes from the raw projection.

use log::warn;

use crate::geo_utils::nearest_point_on_polyline;
use crate::route::RouteModel;
use crate::{GpsPoint, LocationFix};

/// Result of matching one fix against the route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Snapped position on the route polyline.
    pub snapped: GpsPoint,
    /// Index of the route vertex at-or-before the snap point, clamped so it
    /// never decreases within a session.
    pub progress_index: usize,
    /// Cumulative length from route start to the snap point.
    pub distance_along_route_m: f64,
    /// Perpendicular distance from the raw fix to the snapped position.
    pub lateral_distance_m: f64,
}

/// Match a fix against the route, holding `progress_index` at
/// `last_progress_index` when the raw projection would move backwards.
pub fn match_fix(fix: &LocationFix, route: &RouteModel, last_progress_index: usize) -> MatchResult {
    let point = fix.point();
    let projection = nearest_point_on_polyline(&point, route.vertices());

    let progress_index = if projection.segment_index < last_progress_index {
        warn!(
            "match regressed from vertex {} to {}, holding progress",
            last_progress_index, projection.segment_index
        );
        last_progress_index
    } else {
        projection.segment_index
    };

    MatchResult {
        snapped: projection.snapped,
        progress_index,
        distance_along_route_m: projection.distance_along_m,
        lateral_distance_m: projection.lateral_distance_m,
    }
}
