//! Route model and the route-fetch collaborator boundary.
//!
//! A [`RouteModel`] is an immutable snapshot of the active route: an ordered
//! vertex polyline plus an ordered maneuver list sharing the same index
//! space. It is produced once per (re)route and replaced wholesale, never
//! mutated in place.
//!
//! [`RouteGeometry`] is the wire-side form returned by a [`RouteFetcher`];
//! the Valhalla-style encoded shape uses 6 decimal digits of precision
//! (`decode_polyline6`).

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::geo_utils::polyline_length;
use crate::GpsPoint;

/// One turn-by-turn instruction tied to a vertex-index range of the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Human-readable instruction text.
    pub instruction: String,
    /// Index into the route vertices where this instruction becomes active.
    pub begin_index: usize,
    /// Optional index where the instruction's segment ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    /// Length of the maneuver's segment in meters.
    pub length_m: f64,
}

/// Immutable snapshot of the active route.
///
/// Invariants enforced at construction:
/// - at least 2 vertices,
/// - maneuver `begin_index` values non-decreasing in route order,
/// - every maneuver index within the vertex range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteModel {
    vertices: Vec<GpsPoint>,
    maneuvers: Vec<Maneuver>,
}

impl RouteModel {
    /// Build a validated route model.
    ///
    /// # Example
    /// ```
    /// use navtrack::{GpsPoint, RouteModel};
    ///
    /// let route = RouteModel::new(
    ///     vec![GpsPoint::new(47.37, 8.55), GpsPoint::new(47.38, 8.55)],
    ///     vec![],
    /// );
    /// assert!(route.is_ok());
    /// ```
    pub fn new(vertices: Vec<GpsPoint>, maneuvers: Vec<Maneuver>) -> Result<Self> {
        if vertices.len() < 2 {
            return Err(NavError::DegenerateRoute {
                point_count: vertices.len(),
                minimum_required: 2,
            });
        }

        let mut previous = 0;
        for (index, m) in maneuvers.iter().enumerate() {
            if m.begin_index >= vertices.len() {
                return Err(NavError::ManeuverOutOfBounds {
                    index,
                    begin_index: m.begin_index,
                    vertex_count: vertices.len(),
                });
            }
            if m.begin_index < previous {
                return Err(NavError::UnsortedManeuvers {
                    index,
                    begin_index: m.begin_index,
                    previous,
                });
            }
            previous = m.begin_index;
        }

        Ok(Self {
            vertices,
            maneuvers,
        })
    }

    /// Ordered vertex polyline (always ≥ 2 points).
    pub fn vertices(&self) -> &[GpsPoint] {
        &self.vertices
    }

    /// Ordered maneuver list, ascending by `begin_index`.
    pub fn maneuvers(&self) -> &[Maneuver] {
        &self.maneuvers
    }

    /// The route's final vertex (the destination for arrival checks).
    pub fn destination(&self) -> GpsPoint {
        self.vertices[self.vertices.len() - 1]
    }

    /// Total route length in meters.
    pub fn total_length_m(&self) -> f64 {
        polyline_length(&self.vertices)
    }
}

/// Decoded route geometry as returned by the route-fetch collaborator:
/// a polyline plus maneuvers sharing its index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    pub points: Vec<GpsPoint>,
    pub maneuvers: Vec<Maneuver>,
}

impl RouteGeometry {
    /// Convert into an immutable [`RouteModel`], validating invariants.
    pub fn into_model(self) -> Result<RouteModel> {
        RouteModel::new(self.points, self.maneuvers)
    }
}

/// External routing backend. Implementations must be `Send + Sync` so a
/// fetch can run on its own thread while location fixes keep flowing.
///
/// Transport and encoding are the implementation's concern; the core only
/// requires a stable index space shared between polyline and maneuvers.
pub trait RouteFetcher: Send + Sync {
    fn fetch_route(&self, from: GpsPoint, to: GpsPoint, costing: &str) -> Result<RouteGeometry>;
}

// ============================================================================
// Encoded polyline (precision 6)
// ============================================================================

/// Decode a Valhalla-style encoded polyline with 6 decimal digits of
/// precision into GPS points.
pub fn decode_polyline6(shape: &str) -> Result<Vec<GpsPoint>> {
    let bytes = shape.as_bytes();
    let mut points = Vec::new();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while idx < bytes.len() {
        lat += decode_varint(bytes, &mut idx)?;
        lon += decode_varint(bytes, &mut idx)?;
        points.push(GpsPoint::new(lat as f64 / 1e6, lon as f64 / 1e6));
    }

    Ok(points)
}

/// Encode GPS points as a precision-6 polyline (the inverse of
/// [`decode_polyline6`]; used by tests and tooling).
pub fn encode_polyline6(points: &[GpsPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for p in points {
        let lat = (p.latitude * 1e6).round() as i64;
        let lon = (p.longitude * 1e6).round() as i64;
        encode_varint(lat - prev_lat, &mut out);
        encode_varint(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn decode_varint(bytes: &[u8], idx: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*idx) else {
            return Err(NavError::InvalidShape {
                reason: format!("truncated varint at byte {}", idx),
            });
        };
        *idx += 1;

        let chunk = byte as i64 - 63;
        if chunk < 0 {
            return Err(NavError::InvalidShape {
                reason: format!("byte {} out of range at offset {}", byte, *idx - 1),
            });
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    if result & 1 != 0 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

fn encode_varint(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((0x20 | (v & 0x1f)) + 63) as u8) as char);
        v >>= 5;
    }
    out.push(((v + 63) as u8) as char);
}
