//! # Navigation State Machine
//!
//! The engine owns the single [`NavigationSession`] and serializes all
//! mutation: every event (location fix, route-fetch completion, start, stop,
//! manual reroute) is applied one at a time. Each accepted mutation is
//! persisted to the [`SessionStore`](crate::persistence::SessionStore) and
//! broadcast to observers as a [`NavUpdate`].
//!
//! The engine itself never blocks: route fetches are returned to the caller
//! as [`FetchCommand`]s for asynchronous dispatch (see
//! [`runtime::Navigator`] for the threaded wrapper).

pub mod reroute;
pub mod runtime;
pub mod session;

pub use reroute::{FetchCommand, RerouteController};
pub use runtime::{NavEvent, Navigator};
pub use session::{NavigationSession, NavigationState, PersistedSession};

use log::{debug, info, warn};

use crate::error::Result;
use crate::geo_utils::{haversine_distance, polyline_length};
use crate::maneuver::ManeuverTracker;
use crate::matching::match_fix;
use crate::persistence::{MemorySessionStore, SessionStore};
use crate::route::{RouteGeometry, RouteModel};
use crate::track::{NullTrackLogger, TrackLogger};
use crate::{GpsPoint, LocationFix, NavConfig, NavUpdate};

/// Read-only consumer of session snapshots, updated after every processed
/// event. Closures implement this directly.
pub trait SessionObserver {
    fn on_update(&mut self, update: &NavUpdate);
}

impl<F: FnMut(&NavUpdate)> SessionObserver for F {
    fn on_update(&mut self, update: &NavUpdate) {
        self(update)
    }
}

/// The navigation engine: state machine, matcher, maneuver tracker and
/// reroute budget behind one serialized mutation surface.
pub struct NavigationEngine {
    config: NavConfig,
    session: NavigationSession,
    reroute: RerouteController,
    tracker: ManeuverTracker,
    store: Box<dyn SessionStore + Send>,
    track: Box<dyn TrackLogger + Send>,
    observers: Vec<Box<dyn SessionObserver + Send>>,
    displayed_path: Vec<GpsPoint>,
    remaining_distance_m: Option<f64>,
    track_active: bool,
}

impl NavigationEngine {
    /// Engine with an in-memory store and no track logging.
    pub fn new(config: NavConfig) -> Self {
        let reroute = RerouteController::new(config.reroute_attempts);
        Self {
            config,
            session: NavigationSession::new(),
            reroute,
            tracker: ManeuverTracker::new(),
            store: Box::new(MemorySessionStore::new()),
            track: Box::new(NullTrackLogger),
            observers: Vec::new(),
            displayed_path: Vec::new(),
            remaining_distance_m: None,
            track_active: false,
        }
    }

    /// Replace the durable session store.
    pub fn set_session_store(&mut self, store: Box<dyn SessionStore + Send>) {
        self.store = store;
    }

    /// Replace the track-logger collaborator.
    pub fn set_track_logger(&mut self, track: Box<dyn TrackLogger + Send>) {
        self.track = track;
    }

    /// Register a snapshot observer.
    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver + Send>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn state(&self) -> NavigationState {
        self.session.state
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    /// Current presentation snapshot.
    pub fn update(&self) -> NavUpdate {
        NavUpdate {
            state: self.session.state,
            displayed_path: self.displayed_path.clone(),
            active_maneuver: self.tracker.current().cloned(),
            remaining_distance_m: self.remaining_distance_m,
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Begin navigation towards `destination`. Always dispatches the initial
    /// route fetch; it does not consume the reroute budget.
    pub fn start(&mut self, origin: GpsPoint, destination: GpsPoint) -> FetchCommand {
        self.clear_session();
        self.session.state = NavigationState::RouteCalculation;
        self.session.destination = Some(destination);
        self.reroute.reset_budget(&mut self.session);

        info!("navigation started towards {:?}", destination);
        let command = FetchCommand {
            generation: self.session.generation,
            from: origin,
            to: destination,
            costing: self.config.costing.clone(),
        };

        self.persist();
        self.notify();
        command
    }

    /// Begin navigation with an already-fetched route.
    pub fn start_with_route(&mut self, route: RouteModel) {
        self.clear_session();
        self.session.destination = Some(route.destination());
        self.reroute.reset_budget(&mut self.session);
        self.install_route(route);

        self.persist();
        self.notify();
    }

    /// Reconstruct the session from the durable store. Returns `true` when
    /// an active session with a usable route was resumed.
    ///
    /// A persisted `RouteCalculation` state is downgraded to `OffRoute`: the
    /// in-flight fetch did not survive the process, but the retained route
    /// still allows recovery.
    pub fn resume(&mut self) -> bool {
        let record = match self.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                warn!("failed to load persisted session: {}", e);
                return false;
            }
        };

        // The store is outside our control; re-validate before resuming.
        let route = match record.route {
            Some(route) if route.vertices().len() >= 2 && record.state != NavigationState::Idle => {
                route
            }
            _ => {
                debug!("persisted session has no usable route, staying idle");
                return false;
            }
        };
        self.session.state = match record.state {
            NavigationState::RouteCalculation => NavigationState::OffRoute,
            other => other,
        };
        self.session.destination = record.destination.or(Some(route.destination()));
        self.session.progress_index = record.progress_index;
        self.session.reroute_attempts_remaining = record.reroute_attempts_remaining;
        self.session.last_fix = record.last_fix;
        self.session.route = Some(route);

        self.tracker.reset();
        self.recompute_display_from_vertices();
        if matches!(
            self.session.state,
            NavigationState::Navigating | NavigationState::OffRoute
        ) {
            self.track.start();
            self.track_active = true;
        }

        info!("resumed navigation in state {:?}", self.session.state);
        self.notify();
        true
    }

    /// Explicit stop: clear the session, cancel any in-flight fetch via the
    /// generation counter, transition to `Idle`.
    pub fn stop(&mut self) {
        info!("navigation stopped");
        self.clear_session();
        if let Err(e) = self.store.clear() {
            warn!("failed to clear persisted session: {}", e);
        }
        self.notify();
    }

    // ========================================================================
    // Event inputs
    // ========================================================================

    /// Apply one location fix. Returns a fetch command when the deviation
    /// warrants an automatic reroute.
    pub fn on_fix(&mut self, fix: LocationFix) -> Option<FetchCommand> {
        // Sensor-noise gate, applied before the state machine.
        if fix.is_no_fix() {
            debug!("dropping (0,0) placeholder fix");
            return None;
        }
        if fix.accuracy_m > self.config.accuracy_gate_m {
            debug!(
                "dropping fix with accuracy {:.0}m (gate {:.0}m)",
                fix.accuracy_m, self.config.accuracy_gate_m
            );
            return None;
        }

        if self.session.state == NavigationState::Idle {
            return None;
        }
        // Arrival is latched until the session is stopped or restarted.
        if self.session.state == NavigationState::Arrived {
            return None;
        }

        self.session.last_fix = Some(fix);
        self.track.append(&fix);

        let command = match self.session.route.clone() {
            Some(route) => self.apply_fix_with_route(&fix, &route),
            None => {
                // Initial route fetch still in flight; just record the fix.
                None
            }
        };

        self.persist();
        self.notify();
        command
    }

    /// Apply a route-fetch completion. Results carrying a stale generation
    /// (a fetch that raced a stop or a newer route) are ignored.
    pub fn on_route_result(&mut self, generation: u64, result: Result<RouteGeometry>) {
        if !self.reroute.accepts(&self.session, generation) {
            debug!(
                "ignoring stale route result (generation {} != {})",
                generation, self.session.generation
            );
            return;
        }
        if !self.session.is_active() {
            return;
        }

        match result.and_then(RouteGeometry::into_model) {
            Ok(route) => {
                info!(
                    "route installed: {} vertices, {} maneuvers, {:.0}m",
                    route.vertices().len(),
                    route.maneuvers().len(),
                    route.total_length_m()
                );
                self.install_route(route);
            }
            Err(e) => {
                // "No route exists" and "backend unreachable" flatten to the
                // same state; the cause survives in the log.
                warn!("route calculation failed: {}", e);
                self.session.state = NavigationState::RouteCalculationFailed;
            }
        }

        self.persist();
        self.notify();
    }

    /// User-requested reroute: refills the attempt budget, then launches.
    pub fn request_reroute(&mut self) -> Option<FetchCommand> {
        if !self.session.is_active() {
            return None;
        }
        let Some(from) = self.session.last_fix.map(|f| f.point()) else {
            warn!("manual reroute requested without a known position");
            return None;
        };

        self.reroute.reset_budget(&mut self.session);
        let command = self
            .reroute
            .try_launch(&mut self.session, from, &self.config.costing)?;
        self.session.state = NavigationState::RouteCalculation;

        self.persist();
        self.notify();
        Some(command)
    }

    // ========================================================================
    // Transition internals
    // ========================================================================

    fn apply_fix_with_route(&mut self, fix: &LocationFix, route: &RouteModel) -> Option<FetchCommand> {
        // Arrival check comes first, regardless of lateral distance.
        let to_destination = haversine_distance(&fix.point(), &route.destination());
        if to_destination < self.config.arrival_threshold_m {
            info!("arrived ({:.0}m from destination)", to_destination);
            self.session.state = NavigationState::Arrived;
            // A reroute fetch still in flight must not resurrect the
            // finished session; invalidate it like stop does.
            self.session.generation += 1;
            self.tracker.reset();
            self.displayed_path.clear();
            self.remaining_distance_m = None;
            if self.track_active {
                self.track.stop();
                self.track_active = false;
            }
            return None;
        }

        let matched = match_fix(fix, route, self.session.progress_index);
        self.session.progress_index = matched.progress_index;

        // Boundary inclusive: exactly at the threshold counts as on-route.
        if matched.lateral_distance_m <= self.config.off_route_threshold_m {
            if self.session.state != NavigationState::Navigating {
                debug!(
                    "on route ({:.0}m lateral), entering Navigating from {:?}",
                    matched.lateral_distance_m, self.session.state
                );
                self.session.state = NavigationState::Navigating;
            }

            self.recompute_display(route, matched.snapped, matched.progress_index);
            if let Some(status) =
                self.tracker
                    .update(route, matched.progress_index, matched.distance_along_route_m)
            {
                debug!(
                    "maneuver: {} in {:.0}m",
                    status.maneuver.instruction, status.remaining_distance_m
                );
            }
            return None;
        }

        // Deviated. A reroute already in flight keeps its state; anything
        // else becomes OffRoute, escalating to RouteCalculation when the
        // deviation is severe and budget remains.
        if self.session.state == NavigationState::RouteCalculation {
            return None;
        }
        if self.session.state != NavigationState::OffRoute {
            debug!(
                "off route ({:.0}m lateral, threshold {:.0}m)",
                matched.lateral_distance_m, self.config.off_route_threshold_m
            );
            self.session.state = NavigationState::OffRoute;
        }

        if matched.lateral_distance_m > self.config.reroute_distance_threshold_m {
            let command =
                self.reroute
                    .try_launch(&mut self.session, fix.point(), &self.config.costing);
            if command.is_some() {
                self.session.state = NavigationState::RouteCalculation;
            }
            return command;
        }

        None
    }

    fn install_route(&mut self, route: RouteModel) {
        self.session.route = Some(route);
        self.session.progress_index = 0;
        self.session.state = NavigationState::Navigating;
        // New route invalidates any other in-flight fetch.
        self.session.generation += 1;

        self.tracker.reset();
        self.recompute_display_from_vertices();

        if !self.track_active {
            self.track.start();
            self.track_active = true;
        }
    }

    fn clear_session(&mut self) {
        if self.track_active {
            self.track.stop();
            self.track_active = false;
        }
        self.session.reset();
        self.tracker.reset();
        self.displayed_path.clear();
        self.remaining_distance_m = None;
    }

    /// Displayed remaining path = snapped position + all route vertices
    /// after the progress index.
    fn recompute_display(&mut self, route: &RouteModel, snapped: GpsPoint, progress: usize) {
        let vertices = route.vertices();
        let mut path = Vec::with_capacity(vertices.len().saturating_sub(progress));
        path.push(snapped);
        path.extend_from_slice(&vertices[(progress + 1).min(vertices.len())..]);

        self.remaining_distance_m = Some(polyline_length(&path));
        self.displayed_path = path;
    }

    /// Display from the raw vertex suffix (route install, resume), before
    /// any fix has been matched.
    fn recompute_display_from_vertices(&mut self) {
        let Some(route) = &self.session.route else {
            self.displayed_path.clear();
            self.remaining_distance_m = None;
            return;
        };
        let suffix = &route.vertices()[self.session.progress_index.min(route.vertices().len() - 1)..];
        self.displayed_path = suffix.to_vec();
        self.remaining_distance_m = Some(polyline_length(suffix));
    }

    fn persist(&mut self) {
        let record = self.session.to_persisted();
        if let Err(e) = self.store.save(&record) {
            // Durability is best-effort; navigation keeps running.
            warn!("failed to persist session: {}", e);
        }
    }

    fn notify(&mut self) {
        let update = NavUpdate {
            state: self.session.state,
            displayed_path: self.displayed_path.clone(),
            active_maneuver: self.tracker.current().cloned(),
            remaining_distance_m: self.remaining_distance_m,
        };
        for observer in &mut self.observers {
            observer.on_update(&update);
        }
    }
}
