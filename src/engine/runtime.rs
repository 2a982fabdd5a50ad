//! Serialized event queue around the engine.
//!
//! All session mutation flows through one worker thread draining an mpsc
//! channel, so no two events are ever applied concurrently. Route fetches
//! are the only blocking operation; each runs on its own spawned thread
//! against the shared [`RouteFetcher`] and re-enters the queue as a
//! [`NavEvent::RouteFetchCompleted`] carrying its generation token. A fetch
//! that races a stop completes harmlessly: the engine drops results whose
//! generation no longer matches.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use super::NavigationEngine;
use crate::error::Result;
use crate::route::{RouteFetcher, RouteGeometry};
use crate::{GpsPoint, LocationFix};

/// Events accepted by the processing queue.
pub enum NavEvent {
    Start {
        origin: GpsPoint,
        destination: GpsPoint,
    },
    LocationFixReceived(LocationFix),
    RouteFetchCompleted {
        generation: u64,
        result: Result<RouteGeometry>,
    },
    ManualReroute,
    Stop,
    Shutdown,
}

/// Handle to a running navigation worker.
///
/// Dropping the handle shuts the worker down and joins it; fetch threads
/// still in flight at that point complete into a closed channel and are
/// discarded.
pub struct Navigator {
    tx: Sender<NavEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Navigator {
    /// Spawn the worker thread owning `engine`.
    pub fn spawn(engine: NavigationEngine, fetcher: Arc<dyn RouteFetcher>) -> Self {
        let (tx, rx) = mpsc::channel::<NavEvent>();
        let loop_tx = tx.clone();

        let worker = thread::spawn(move || {
            let mut engine = engine;
            while let Ok(event) = rx.recv() {
                let command = match event {
                    NavEvent::Start {
                        origin,
                        destination,
                    } => Some(engine.start(origin, destination)),
                    NavEvent::LocationFixReceived(fix) => engine.on_fix(fix),
                    NavEvent::RouteFetchCompleted { generation, result } => {
                        engine.on_route_result(generation, result);
                        None
                    }
                    NavEvent::ManualReroute => engine.request_reroute(),
                    NavEvent::Stop => {
                        engine.stop();
                        None
                    }
                    NavEvent::Shutdown => break,
                };

                // Dispatch the fetch off the fix-processing path so a slow
                // backend cannot stall location updates.
                if let Some(command) = command {
                    let fetcher = Arc::clone(&fetcher);
                    let result_tx = loop_tx.clone();
                    thread::spawn(move || {
                        let result =
                            fetcher.fetch_route(command.from, command.to, &command.costing);
                        if result_tx
                            .send(NavEvent::RouteFetchCompleted {
                                generation: command.generation,
                                result,
                            })
                            .is_err()
                        {
                            debug!("navigator gone before fetch completed");
                        }
                    });
                }
            }
        });

        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Begin navigation towards `destination`.
    pub fn start(&self, origin: GpsPoint, destination: GpsPoint) {
        let _ = self.tx.send(NavEvent::Start {
            origin,
            destination,
        });
    }

    /// Push one location fix; fixes are applied in arrival order.
    pub fn on_fix(&self, fix: LocationFix) {
        let _ = self.tx.send(NavEvent::LocationFixReceived(fix));
    }

    /// User-requested reroute (resets the attempt budget).
    pub fn request_reroute(&self) {
        let _ = self.tx.send(NavEvent::ManualReroute);
    }

    /// Stop navigation, cancelling any in-flight fetch.
    pub fn stop(&self) {
        let _ = self.tx.send(NavEvent::Stop);
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        let _ = self.tx.send(NavEvent::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
