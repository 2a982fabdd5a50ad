//! Unified error handling for the navigation core.
//!
//! Nothing in this crate is fatal to the host process: every failure either
//! maps to a defined [`NavigationState`](crate::engine::NavigationState) or
//! surfaces here as a recoverable [`NavError`].

use thiserror::Error;

/// Errors produced by the navigation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    /// A route polyline is too short to navigate against.
    #[error("route polyline has {point_count} points, at least {minimum_required} required")]
    DegenerateRoute {
        point_count: usize,
        minimum_required: usize,
    },

    /// Maneuver begin indices must be non-decreasing in route order.
    #[error(
        "maneuver {index} begins at vertex {begin_index}, before previous maneuver at {previous}"
    )]
    UnsortedManeuvers {
        index: usize,
        begin_index: usize,
        previous: usize,
    },

    /// A maneuver references a vertex outside the route polyline.
    #[error("maneuver {index} begins at vertex {begin_index}, but route has {vertex_count} vertices")]
    ManeuverOutOfBounds {
        index: usize,
        begin_index: usize,
        vertex_count: usize,
    },

    /// An encoded polyline shape could not be decoded.
    #[error("invalid polyline shape: {reason}")]
    InvalidShape { reason: String },

    /// The route-fetch collaborator failed (transport error, non-2xx,
    /// malformed response, or no route found). The cause is preserved for
    /// logging even though the state machine flattens it to
    /// `RouteCalculationFailed`.
    #[error("route fetch failed: {reason}")]
    RouteFetch { reason: String },

    /// The durable session store could not be read or written.
    #[error("session persistence failed: {reason}")]
    Persistence { reason: String },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NavError>;

impl NavError {
    /// Shorthand for a route-fetch failure with a formatted cause.
    pub fn fetch(reason: impl Into<String>) -> Self {
        NavError::RouteFetch {
            reason: reason.into(),
        }
    }

    /// Shorthand for a persistence failure with a formatted cause.
    pub fn persistence(reason: impl Into<String>) -> Self {
        NavError::Persistence {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::persistence(e.to_string())
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for NavError {
    fn from(e: rusqlite::Error) -> Self {
        NavError::persistence(e.to_string())
    }
}
