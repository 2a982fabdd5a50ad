//! Valhalla-style HTTP route fetcher.
//!
//! Implements the route-fetch collaborator against a Valhalla `/route`
//! endpoint: request body `{locations: [{lat, lon}, ...], costing}`,
//! response `{trip: {legs: [{shape, maneuvers}]}}` with the shape encoded
//! as a precision-6 polyline.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::route::{decode_polyline6, Maneuver, RouteFetcher, RouteGeometry};
use crate::GpsPoint;

/// Routes via a Valhalla-compatible HTTP endpoint.
pub struct ValhallaRouteFetcher {
    client: Client,
    endpoint: String,
}

impl ValhallaRouteFetcher {
    /// Build a fetcher for `endpoint` (e.g. `"https://valhalla1.openstreetmap.de"`).
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NavError::fetch(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    locations: [RequestLocation; 2],
    costing: &'a str,
}

#[derive(Serialize)]
struct RequestLocation {
    lat: f64,
    lon: f64,
}

/// Minimal Valhalla JSON response structures.
#[derive(Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Deserialize)]
struct Trip {
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Leg {
    shape: String,
    #[serde(default)]
    maneuvers: Vec<WireManeuver>,
}

#[derive(Deserialize)]
struct WireManeuver {
    instruction: String,
    begin_shape_index: usize,
    #[serde(default)]
    end_shape_index: Option<usize>,
    /// Leg-local maneuver length in kilometers (Valhalla default units).
    #[serde(default)]
    length: f64,
}

impl RouteFetcher for ValhallaRouteFetcher {
    fn fetch_route(&self, from: GpsPoint, to: GpsPoint, costing: &str) -> Result<RouteGeometry> {
        let request = RouteRequest {
            locations: [
                RequestLocation {
                    lat: from.latitude,
                    lon: from.longitude,
                },
                RequestLocation {
                    lat: to.latitude,
                    lon: to.longitude,
                },
            ],
            costing,
        };

        let response = self
            .client
            .post(format!("{}/route", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| NavError::fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NavError::fetch(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let body: RouteResponse = response
            .json()
            .map_err(|e| NavError::fetch(format!("malformed response: {}", e)))?;

        assemble_geometry(body)
    }
}

/// Concatenate legs into one polyline with a shared maneuver index space.
fn assemble_geometry(body: RouteResponse) -> Result<RouteGeometry> {
    let mut points: Vec<GpsPoint> = Vec::new();
    let mut maneuvers: Vec<Maneuver> = Vec::new();

    for leg in body.trip.legs {
        let leg_points = decode_polyline6(&leg.shape)?;
        let offset = points.len();

        for m in leg.maneuvers {
            maneuvers.push(Maneuver {
                instruction: m.instruction,
                begin_index: offset + m.begin_shape_index,
                end_index: m.end_shape_index.map(|i| offset + i),
                length_m: m.length * 1000.0,
            });
        }
        points.extend(leg_points);
    }

    if points.len() < 2 {
        return Err(NavError::fetch("empty route".to_string()));
    }

    Ok(RouteGeometry { points, maneuvers })
}
