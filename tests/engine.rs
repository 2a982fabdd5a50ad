//! Tests for the navigation state machine

use approx::assert_relative_eq;
use navtrack::engine::{NavigationEngine, NavigationState};
use navtrack::error::NavError;
use navtrack::synthetic::{offset_point, straight_route};
use navtrack::{
    GpsPoint, LocationFix, Maneuver, MemoryTrackLogger, NavConfig, RouteGeometry, RouteModel,
};

fn origin() -> GpsPoint {
    GpsPoint::new(47.3769, 8.5417)
}

/// Fix `along_m` meters along the (northbound) route, displaced `lateral_m`
/// meters to the east.
fn fix(along_m: f64, lateral_m: f64) -> LocationFix {
    let position = offset_point(offset_point(origin(), 0.0, along_m), 90.0, lateral_m);
    LocationFix::new(position.latitude, position.longitude, 8.0, 0)
}

/// The spec walkthrough route: P0..P3 collinear, 100m apart, one maneuver
/// at vertex 2.
fn walkthrough_route() -> RouteModel {
    RouteModel::new(
        straight_route(origin(), 0.0, 300.0, 100.0),
        vec![Maneuver {
            instruction: "Turn left".to_string(),
            begin_index: 2,
            end_index: None,
            length_m: 100.0,
        }],
    )
    .unwrap()
}

fn engine_with_route(route: RouteModel) -> NavigationEngine {
    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.start_with_route(route);
    engine
}

fn geometry(length_m: f64) -> RouteGeometry {
    RouteGeometry {
        points: straight_route(origin(), 0.0, length_m, 100.0),
        maneuvers: vec![],
    }
}

// ========================================================================
// Spec walkthrough
// ========================================================================

#[test]
fn collinear_route_walkthrough() {
    let mut engine = engine_with_route(walkthrough_route());

    // Fix 150m along the route with 10m lateral offset.
    let command = engine.on_fix(fix(150.0, 10.0));
    assert!(command.is_none());
    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.session().progress_index, 1);

    let update = engine.update();
    let status = update.active_maneuver.expect("maneuver expected");
    assert_eq!(status.maneuver.begin_index, 2);
    assert_relative_eq!(status.remaining_distance_m, 50.0, max_relative = 0.05);

    // 90m lateral: off-route, but not severe enough to reroute.
    let command = engine.on_fix(fix(150.0, 90.0));
    assert!(command.is_none());
    assert_eq!(engine.state(), NavigationState::OffRoute);

    // 150m lateral: severe deviation, exactly one reroute dispatch.
    let command = engine.on_fix(fix(150.0, 150.0));
    assert!(command.is_some());
    assert_eq!(engine.state(), NavigationState::RouteCalculation);

    // Further far fixes do not dispatch while the fetch is in flight.
    let command = engine.on_fix(fix(150.0, 160.0));
    assert!(command.is_none());
    assert_eq!(engine.state(), NavigationState::RouteCalculation);
}

// ========================================================================
// Fix gating
// ========================================================================

#[test]
fn test_idle_ignores_fixes() {
    let mut engine = NavigationEngine::new(NavConfig::default());
    assert!(engine.on_fix(fix(0.0, 0.0)).is_none());
    assert_eq!(engine.state(), NavigationState::Idle);
    assert!(engine.session().last_fix.is_none());
}

#[test]
fn test_accuracy_gate_drops_noisy_fixes() {
    let mut engine = engine_with_route(walkthrough_route());

    let mut noisy = fix(150.0, 10.0);
    noisy.accuracy_m = 231.0;
    assert!(engine.on_fix(noisy).is_none());
    assert!(engine.session().last_fix.is_none());

    // Exactly at the gate is still accepted.
    let mut edge = fix(150.0, 10.0);
    edge.accuracy_m = 230.0;
    engine.on_fix(edge);
    assert!(engine.session().last_fix.is_some());
}

#[test]
fn test_zero_zero_fix_is_not_a_position() {
    let mut engine = engine_with_route(walkthrough_route());
    let placeholder = LocationFix::new(0.0, 0.0, 5.0, 0);
    assert!(engine.on_fix(placeholder).is_none());
    assert!(engine.session().last_fix.is_none());
    assert_eq!(engine.state(), NavigationState::Navigating);
}

// ========================================================================
// Off-route boundary
// ========================================================================

#[test]
fn test_off_route_boundary_is_inclusive() {
    // The engine compares lateral <= threshold. Planar offsets round-trip
    // through haversine within centimeters, so bracket the 70m threshold.
    let mut engine = engine_with_route(walkthrough_route());

    engine.on_fix(fix(150.0, 69.9));
    assert_eq!(engine.state(), NavigationState::Navigating);

    engine.on_fix(fix(150.0, 70.9));
    assert_eq!(engine.state(), NavigationState::OffRoute);

    // Returning within threshold recovers to Navigating.
    engine.on_fix(fix(150.0, 50.0));
    assert_eq!(engine.state(), NavigationState::Navigating);
}

// ========================================================================
// Arrival
// ========================================================================

#[test]
fn test_arrival_wins_over_lateral_distance() {
    let track = MemoryTrackLogger::new();
    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_track_logger(Box::new(track.clone()));
    engine.start_with_route(walkthrough_route());

    // 250m along + 80m lateral: ~94m from the final vertex, which is under
    // the arrival threshold even though 80m lateral would be off-route.
    engine.on_fix(fix(250.0, 80.0));
    assert_eq!(engine.state(), NavigationState::Arrived);

    let update = engine.update();
    assert!(update.displayed_path.is_empty());
    assert!(update.active_maneuver.is_none());
    assert_eq!(track.stops(), 1);

    // Arrival latches: further fixes are ignored.
    assert!(engine.on_fix(fix(150.0, 10.0)).is_none());
    assert_eq!(engine.state(), NavigationState::Arrived);
}

#[test]
fn test_route_result_after_arrival_is_ignored() {
    let track = MemoryTrackLogger::new();
    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_track_logger(Box::new(track.clone()));
    engine.start_with_route(walkthrough_route());

    // Severe deviation launches a reroute fetch.
    let command = engine.on_fix(fix(150.0, 150.0)).expect("reroute dispatch");

    // Arrival while the fetch is still in flight finishes the session.
    engine.on_fix(fix(290.0, 0.0));
    assert_eq!(engine.state(), NavigationState::Arrived);
    assert_eq!(track.stops(), 1);

    // The fetch completes afterwards; it must not resurrect the session.
    engine.on_route_result(command.generation, Ok(geometry(500.0)));
    assert_eq!(engine.state(), NavigationState::Arrived);
    assert!(engine.update().displayed_path.is_empty());
    assert_eq!(track.starts(), 1);
    assert_eq!(track.stops(), 1);
}

#[test]
fn test_no_arrival_outside_threshold() {
    let mut engine = engine_with_route(walkthrough_route());
    engine.on_fix(fix(180.0, 10.0));
    assert_eq!(engine.state(), NavigationState::Navigating);
}

// ========================================================================
// Reroute budget
// ========================================================================

#[test]
fn test_reroute_attempts_capped_by_launch_count() {
    let mut engine = engine_with_route(walkthrough_route());
    let mut launched = 0;

    // Each cycle: severe deviation dispatches, then the fetch fails.
    for _ in 0..8 {
        if let Some(command) = engine.on_fix(fix(150.0, 150.0)) {
            launched += 1;
            engine.on_route_result(command.generation, Err(NavError::fetch("unreachable")));
            assert_eq!(engine.state(), NavigationState::RouteCalculationFailed);
        }
    }

    assert_eq!(launched, 5);
    assert_eq!(engine.session().reroute_attempts_remaining, 0);
    // Exhausted budget leaves the agent off-route, not failed.
    engine.on_fix(fix(150.0, 150.0));
    assert_eq!(engine.state(), NavigationState::OffRoute);
}

#[test]
fn test_manual_reroute_resets_budget() {
    let mut engine = engine_with_route(walkthrough_route());

    for _ in 0..8 {
        if let Some(command) = engine.on_fix(fix(150.0, 150.0)) {
            engine.on_route_result(command.generation, Err(NavError::fetch("unreachable")));
        }
    }
    assert_eq!(engine.session().reroute_attempts_remaining, 0);

    let command = engine.request_reroute();
    assert!(command.is_some());
    assert_eq!(engine.state(), NavigationState::RouteCalculation);
    // Reset to 5, one launch consumed.
    assert_eq!(engine.session().reroute_attempts_remaining, 4);
}

// ========================================================================
// Route-fetch completion
// ========================================================================

#[test]
fn test_start_installs_fetched_route() {
    let mut engine = NavigationEngine::new(NavConfig::default());
    let destination = offset_point(origin(), 0.0, 500.0);

    let command = engine.start(origin(), destination);
    assert_eq!(engine.state(), NavigationState::RouteCalculation);
    // The initial fetch does not consume the reroute budget.
    assert_eq!(engine.session().reroute_attempts_remaining, 5);

    engine.on_route_result(command.generation, Ok(geometry(500.0)));
    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.session().progress_index, 0);
    assert!(engine.session().route.is_some());
}

#[test]
fn test_empty_route_fails_but_keeps_session() {
    let mut engine = NavigationEngine::new(NavConfig::default());
    let destination = offset_point(origin(), 0.0, 500.0);

    let command = engine.start(origin(), destination);
    engine.on_route_result(
        command.generation,
        Ok(RouteGeometry {
            points: vec![],
            maneuvers: vec![],
        }),
    );

    assert_eq!(engine.state(), NavigationState::RouteCalculationFailed);
    assert!(engine.session().is_active());
}

#[test]
fn test_stale_route_result_is_ignored() {
    let mut engine = engine_with_route(walkthrough_route());

    let command = engine.on_fix(fix(150.0, 150.0)).expect("reroute dispatch");
    engine.stop();
    assert_eq!(engine.state(), NavigationState::Idle);

    // The fetch completes after the stop; its generation no longer matches.
    engine.on_route_result(command.generation, Ok(geometry(500.0)));
    assert_eq!(engine.state(), NavigationState::Idle);
    assert!(engine.session().route.is_none());
}

#[test]
fn test_successful_reroute_replaces_route_and_resets_progress() {
    let mut engine = engine_with_route(walkthrough_route());

    engine.on_fix(fix(150.0, 10.0));
    assert_eq!(engine.session().progress_index, 1);

    let command = engine.on_fix(fix(150.0, 150.0)).expect("reroute dispatch");
    engine.on_route_result(command.generation, Ok(geometry(700.0)));

    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.session().progress_index, 0);
    assert_relative_eq!(
        engine.session().route.as_ref().unwrap().total_length_m(),
        700.0,
        max_relative = 0.01
    );
}

// ========================================================================
// Track logging
// ========================================================================

#[test]
fn test_track_logger_lifecycle() {
    let track = MemoryTrackLogger::new();
    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_track_logger(Box::new(track.clone()));

    engine.start_with_route(walkthrough_route());
    assert_eq!(track.starts(), 1);

    engine.on_fix(fix(50.0, 5.0));
    engine.on_fix(fix(100.0, 5.0));
    assert_eq!(track.fix_count(), 2);

    engine.stop();
    assert_eq!(track.stops(), 1);
}

// ========================================================================
// Stop
// ========================================================================

#[test]
fn test_stop_clears_session() {
    let mut engine = engine_with_route(walkthrough_route());
    engine.on_fix(fix(150.0, 10.0));

    engine.stop();
    assert_eq!(engine.state(), NavigationState::Idle);
    assert!(engine.session().route.is_none());
    assert!(engine.session().last_fix.is_none());
    assert!(engine.update().displayed_path.is_empty());
}
