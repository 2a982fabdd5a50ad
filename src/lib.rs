//! # navtrack
//!
//! Turn-by-turn navigation core for tracking a moving agent against a
//! precomputed route polyline.
//!
//! This library provides:
//! - Geometry kernel: great-circle distance, bearing, nearest-point-on-polyline
//! - Map matching with monotonic route progress
//! - A six-state navigation state machine (on-route / off-route / arrival)
//! - Bounded-retry rerouting with a stale-result generation guard
//! - Maneuver tracking with change-deduplicated emission
//! - Durable session persistence for resume-after-restart
//!
//! ## Features
//!
//! - **`persistence`** (default) - SQLite session store
//! - **`http`** - Valhalla-style HTTP route fetcher
//!
//! ## Quick Start
//!
//! ```rust
//! use navtrack::{GpsPoint, LocationFix, NavConfig, RouteModel};
//! use navtrack::engine::{NavigationEngine, NavigationState};
//!
//! // A short straight route, vertices ~111m apart.
//! let route = RouteModel::new(
//!     vec![
//!         GpsPoint::new(47.3700, 8.5500),
//!         GpsPoint::new(47.3710, 8.5500),
//!         GpsPoint::new(47.3720, 8.5500),
//!     ],
//!     vec![],
//! )
//! .unwrap();
//!
//! let mut engine = NavigationEngine::new(NavConfig::default());
//! engine.start_with_route(route);
//!
//! // A fix right on the route keeps us navigating.
//! engine.on_fix(LocationFix::new(47.3705, 8.5500, 5.0, 0));
//! assert_eq!(engine.state(), NavigationState::Navigating);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{NavError, Result};

// Geometry kernel (distance, bearing, projection, path length)
pub mod geo_utils;
pub use geo_utils::PolylineProjection;

// Route model and the route-fetch collaborator boundary
pub mod route;
pub use route::{decode_polyline6, encode_polyline6, Maneuver, RouteFetcher, RouteGeometry, RouteModel};

// Map matching
pub mod matching;
pub use matching::{match_fix, MatchResult};

// Maneuver tracking
pub mod maneuver;
pub use maneuver::{active_maneuver, ManeuverStatus, ManeuverTracker};

// Navigation state machine, session, runtime
pub mod engine;
pub use engine::{NavigationEngine, NavigationState, Navigator};

// Durable session storage
pub mod persistence;
pub use persistence::{MemorySessionStore, SessionStore};
#[cfg(feature = "persistence")]
pub use persistence::SqliteSessionStore;

// Track-logger collaborator boundary
pub mod track;
pub use track::{MemoryTrackLogger, NullTrackLogger, TrackLogger};

// Valhalla-style HTTP route fetcher
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::ValhallaRouteFetcher;

// Synthetic fix/route generation for tests and tooling
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use navtrack::GpsPoint;
/// let point = GpsPoint::new(47.3769, 8.5417); // Zurich
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One reported location sample from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters (1-sigma).
    pub accuracy_m: f64,
    /// Course over ground in degrees, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing_deg: Option<f64>,
    /// Ground speed in meters per second, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            bearing_deg: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// (0, 0) is the location source's "no fix yet" placeholder, never a
    /// real position.
    pub fn is_no_fix(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// Configuration for the navigation state machine.
///
/// Historical deployments disagreed on some of these values (30m vs 100m
/// arrival); they are configuration, not constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavConfig {
    /// Fixes with horizontal accuracy worse than this are discarded before
    /// reaching the state machine. Default: 230.0 meters
    pub accuracy_gate_m: f64,

    /// Lateral distance up to which (inclusive) a matched fix counts as
    /// on-route. Default: 70.0 meters
    pub off_route_threshold_m: f64,

    /// Lateral distance beyond which an automatic reroute is launched
    /// (budget permitting). Default: 100.0 meters
    pub reroute_distance_threshold_m: f64,

    /// Distance to the route's final vertex below which the session is
    /// considered arrived. Default: 100.0 meters
    pub arrival_threshold_m: f64,

    /// Automatic reroute launches per navigation start or manual reroute
    /// request. Default: 5
    pub reroute_attempts: u32,

    /// Costing model passed to the route-fetch collaborator.
    /// Default: "pedestrian"
    pub costing: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            accuracy_gate_m: 230.0,
            off_route_threshold_m: 70.0,
            reroute_distance_threshold_m: 100.0,
            arrival_threshold_m: 100.0,
            reroute_attempts: 5,
            costing: "pedestrian".to_string(),
        }
    }
}

/// Presentation snapshot emitted to observers after every processed event.
#[derive(Debug, Clone, PartialEq)]
pub struct NavUpdate {
    pub state: engine::NavigationState,
    /// Snapped position plus the remaining route vertices.
    pub displayed_path: Vec<GpsPoint>,
    /// Upcoming instruction and the distance until it becomes due.
    pub active_maneuver: Option<ManeuverStatus>,
    /// Length of the displayed remaining path in meters.
    pub remaining_distance_m: Option<f64>,
}
