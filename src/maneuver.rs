//! Maneuver tracker: derives the "current instruction + remaining distance"
//! projection for display from the progress index and route model.
//!
//! The active maneuver is the first maneuver in route order whose
//! `begin_index` lies beyond the progress index — the upcoming instruction,
//! not the one just completed. Emission is deduplicated so downstream
//! presentation layers are not notified for unchanged values.

use crate::geo_utils::{cumulative_distances, path_length};
use crate::route::{Maneuver, RouteModel};

/// The upcoming instruction plus the distance left until it becomes due.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverStatus {
    pub maneuver: Maneuver,
    pub remaining_distance_m: f64,
}

/// Active maneuver anchored at a route vertex.
///
/// `remaining_distance_m` is the path length from vertex `progress_index` to
/// the maneuver's begin vertex. Returns `None` past all maneuvers (final
/// stretch to destination) or when the route has no maneuvers.
pub fn active_maneuver(route: &RouteModel, progress_index: usize) -> Option<ManeuverStatus> {
    let maneuver = route
        .maneuvers()
        .iter()
        .find(|m| m.begin_index > progress_index)?;

    Some(ManeuverStatus {
        maneuver: maneuver.clone(),
        remaining_distance_m: path_length(route.vertices(), progress_index, maneuver.begin_index),
    })
}

/// Active maneuver anchored at an exact snapped position.
///
/// `distance_along_m` is the matched distance from the route start, so the
/// remaining distance reflects where the agent actually is between vertices
/// instead of rounding down to the last passed vertex.
pub fn active_maneuver_at(
    route: &RouteModel,
    progress_index: usize,
    distance_along_m: f64,
) -> Option<ManeuverStatus> {
    let maneuver = route
        .maneuvers()
        .iter()
        .find(|m| m.begin_index > progress_index)?;

    let cumulative = cumulative_distances(route.vertices());
    let remaining = (cumulative[maneuver.begin_index] - distance_along_m).max(0.0);

    Some(ManeuverStatus {
        maneuver: maneuver.clone(),
        remaining_distance_m: remaining,
    })
}

/// Change-deduplicated maneuver emission.
///
/// `update` recomputes the active maneuver and returns it only when the
/// (maneuver, whole-meter distance) pair differs from the last emission.
/// The last computed status stays available through [`current`](Self::current)
/// for snapshot assembly.
#[derive(Debug, Default)]
pub struct ManeuverTracker {
    current: Option<ManeuverStatus>,
    last_emitted: Option<(usize, i64)>,
}

impl ManeuverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all tracked state; call when a new route is installed or the
    /// session ends.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_emitted = None;
    }

    /// Recompute the active maneuver for a matched position. Returns
    /// `Some(status)` only when the emission key changed. Remaining distance
    /// is compared at whole-meter granularity: sub-meter movement does not
    /// re-emit.
    pub fn update(
        &mut self,
        route: &RouteModel,
        progress_index: usize,
        distance_along_m: f64,
    ) -> Option<ManeuverStatus> {
        let status = active_maneuver_at(route, progress_index, distance_along_m);
        self.current = status.clone();

        let key = status
            .as_ref()
            .map(|s| (s.maneuver.begin_index, s.remaining_distance_m.round() as i64));

        match (key, self.last_emitted) {
            (Some(k), Some(last)) if k == last => None,
            (Some(k), _) => {
                self.last_emitted = Some(k);
                status
            }
            (None, _) => {
                self.last_emitted = None;
                None
            }
        }
    }

    /// The most recently computed status, if any.
    pub fn current(&self) -> Option<&ManeuverStatus> {
        self.current.as_ref()
    }
}
