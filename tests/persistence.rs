//! Tests for durable session storage and resume-after-restart

use std::sync::{Arc, Mutex};

use navtrack::engine::{NavigationEngine, NavigationState, PersistedSession};
use navtrack::synthetic::{offset_point, straight_route};
use navtrack::{
    GpsPoint, LocationFix, Maneuver, MemorySessionStore, NavConfig, RouteModel, SessionStore,
};

fn origin() -> GpsPoint {
    GpsPoint::new(47.3769, 8.5417)
}

fn sample_route() -> RouteModel {
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

fn sample_record(state: NavigationState) -> PersistedSession {
    PersistedSession {
        state,
        route: Some(sample_route()),
        progress_index: 1,
        reroute_attempts_remaining: 3,
        last_fix: Some(LocationFix::new(47.3782, 8.5417, 8.0, 1_700_000_000_000)),
        destination: Some(offset_point(origin(), 0.0, 300.0)),
    }
}

/// Store handle that survives "restarts": clones share the same record, so
/// one engine can persist and a fresh engine can resume from it.
#[derive(Clone, Default)]
struct SharedStore {
    inner: Arc<Mutex<MemorySessionStore>>,
}

impl SessionStore for SharedStore {
    fn save(&mut self, session: &PersistedSession) -> navtrack::Result<()> {
        self.inner.lock().unwrap().save(session)
    }

    fn load(&mut self) -> navtrack::Result<Option<PersistedSession>> {
        self.inner.lock().unwrap().load()
    }

    fn clear(&mut self) -> navtrack::Result<()> {
        self.inner.lock().unwrap().clear()
    }
}

// ========================================================================
// Engine persist + resume
// ========================================================================

#[test]
fn test_engine_persists_and_resumes_session() {
    let store = SharedStore::default();

    let mut first = NavigationEngine::new(NavConfig::default());
    first.set_session_store(Box::new(store.clone()));
    first.start_with_route(sample_route());

    // Walk 150m along the route so progress advances.
    let position = offset_point(origin(), 0.0, 150.0);
    first.on_fix(LocationFix::new(position.latitude, position.longitude, 8.0, 0));
    assert_eq!(first.state(), NavigationState::Navigating);
    assert_eq!(first.session().progress_index, 1);

    // "Restart": a fresh engine against the same store.
    let mut second = NavigationEngine::new(NavConfig::default());
    second.set_session_store(Box::new(store));
    assert!(second.resume());

    assert_eq!(second.state(), NavigationState::Navigating);
    assert_eq!(second.session().progress_index, 1);
    assert_eq!(second.session().route, first.session().route);
    assert_eq!(second.session().last_fix, first.session().last_fix);

    // The resumed session keeps working: the next fix matches normally.
    let next = offset_point(origin(), 0.0, 170.0);
    second.on_fix(LocationFix::new(next.latitude, next.longitude, 8.0, 1000));
    assert_eq!(second.state(), NavigationState::Navigating);
}

#[test]
fn test_resume_downgrades_in_flight_route_calculation() {
    let store = SharedStore::default();
    store
        .inner
        .lock()
        .unwrap()
        .save(&sample_record(NavigationState::RouteCalculation))
        .unwrap();

    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_session_store(Box::new(store));
    assert!(engine.resume());

    // The in-flight fetch did not survive the restart.
    assert_eq!(engine.state(), NavigationState::OffRoute);
    assert_eq!(engine.session().progress_index, 1);
}

#[test]
fn test_resume_without_record_stays_idle() {
    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_session_store(Box::new(SharedStore::default()));
    assert!(!engine.resume());
    assert_eq!(engine.state(), NavigationState::Idle);
}

#[test]
fn test_resume_rejects_record_without_route() {
    let store = SharedStore::default();
    let mut record = sample_record(NavigationState::Navigating);
    record.route = None;
    store.inner.lock().unwrap().save(&record).unwrap();

    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_session_store(Box::new(store));
    assert!(!engine.resume());
    assert_eq!(engine.state(), NavigationState::Idle);
}

#[test]
fn test_stop_clears_the_store() {
    let store = SharedStore::default();

    let mut engine = NavigationEngine::new(NavConfig::default());
    engine.set_session_store(Box::new(store.clone()));
    engine.start_with_route(sample_route());
    engine.stop();

    assert!(store.inner.lock().unwrap().load().unwrap().is_none());
}

// ========================================================================
// SQLite store
// ========================================================================

#[cfg(feature = "persistence")]
mod sqlite {
    use super::*;
    use navtrack::SqliteSessionStore;

    #[test]
    fn test_save_load_round_trip() {
        let mut store = SqliteSessionStore::open_in_memory().unwrap();
        let record = sample_record(NavigationState::OffRoute);

        store.save(&record).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_empty_store() {
        let mut store = SqliteSessionStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let mut store = SqliteSessionStore::open_in_memory().unwrap();

        store
            .save(&sample_record(NavigationState::Navigating))
            .unwrap();
        let mut updated = sample_record(NavigationState::OffRoute);
        updated.progress_index = 2;
        updated.reroute_attempts_remaining = 1;
        store.save(&updated).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.state, NavigationState::OffRoute);
        assert_eq!(loaded.progress_index, 2);
        assert_eq!(loaded.reroute_attempts_remaining, 1);
    }

    #[test]
    fn test_clear_removes_record() {
        let mut store = SqliteSessionStore::open_in_memory().unwrap();
        store
            .save(&sample_record(NavigationState::Navigating))
            .unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_optional_fields_survive_as_null() {
        let mut store = SqliteSessionStore::open_in_memory().unwrap();
        let record = PersistedSession {
            state: NavigationState::RouteCalculationFailed,
            route: Some(sample_route()),
            progress_index: 0,
            reroute_attempts_remaining: 0,
            last_fix: None,
            destination: None,
        };

        store.save(&record).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, record);
    }
}
