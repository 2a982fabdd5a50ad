//! Navigation session: the single mutable core owned by the state machine,
//! plus its durable on-disk form.

use serde::{Deserialize, Serialize};

use crate::route::RouteModel;
use crate::{GpsPoint, LocationFix};

/// Navigation state machine states.
///
/// `Idle` is both the initial state and the terminal state on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationState {
    /// No active session; fixes are ignored.
    Idle,
    /// A route fetch (initial or reroute) is in flight.
    RouteCalculation,
    /// On-route and progressing.
    Navigating,
    /// Deviated beyond the off-route threshold.
    OffRoute,
    /// The last route fetch failed or returned an unusable route; the
    /// session is retained for manual retry.
    RouteCalculationFailed,
    /// Within the arrival threshold of the destination.
    Arrived,
}

/// The single mutable navigation session, exclusively owned by the engine.
///
/// `progress_index` is monotonically non-decreasing for the session's
/// lifetime and resets only when a new route is installed. `generation`
/// increments on every stop, route install and arrival so stale route-fetch
/// results are provably ignored.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub state: NavigationState,
    pub route: Option<RouteModel>,
    pub progress_index: usize,
    pub reroute_attempts_remaining: u32,
    pub last_fix: Option<LocationFix>,
    /// Destination of the current navigation request; kept separately from
    /// the route so a reroute can target the original destination even when
    /// no route is installed yet.
    pub destination: Option<GpsPoint>,
    /// Session generation counter for the stale-result guard.
    pub generation: u64,
}

impl NavigationSession {
    pub fn new() -> Self {
        Self {
            state: NavigationState::Idle,
            route: None,
            progress_index: 0,
            reroute_attempts_remaining: 0,
            last_fix: None,
            destination: None,
            generation: 0,
        }
    }

    /// True while a navigation session exists (any state except `Idle`).
    pub fn is_active(&self) -> bool {
        self.state != NavigationState::Idle
    }

    /// Clear back to `Idle`, invalidating any in-flight route fetch.
    pub fn reset(&mut self) {
        self.state = NavigationState::Idle;
        self.route = None;
        self.progress_index = 0;
        self.reroute_attempts_remaining = 0;
        self.last_fix = None;
        self.destination = None;
        self.generation += 1;
    }

    /// Durable snapshot of the session.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            state: self.state,
            route: self.route.clone(),
            progress_index: self.progress_index,
            reroute_attempts_remaining: self.reroute_attempts_remaining,
            last_fix: self.last_fix,
            destination: self.destination,
        }
    }
}

impl Default for NavigationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable session record written to the durable store after every
/// accepted mutation, so a process restart can resume navigation without
/// re-fetching the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: NavigationState,
    pub route: Option<RouteModel>,
    pub progress_index: usize,
    pub reroute_attempts_remaining: u32,
    pub last_fix: Option<LocationFix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<GpsPoint>,
}
