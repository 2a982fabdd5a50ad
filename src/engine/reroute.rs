//! Reroute controller: bounded-retry recovery around the external
//! route-fetch collaborator.
//!
//! At most `initial_budget` reroute launches per navigation session; the
//! counter resets on fresh navigation start and on an explicit user-requested
//! reroute. The budget is decremented when an attempt is launched, not on its
//! outcome, so attempts are capped purely by launch count. Each command
//! carries the session generation so results racing a stop are dropped.

use log::debug;

use super::session::NavigationSession;
use crate::GpsPoint;

/// A route-fetch request handed to the runtime for asynchronous dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCommand {
    /// Session generation at launch time; results with a different
    /// generation are stale and must be ignored.
    pub generation: u64,
    pub from: GpsPoint,
    pub to: GpsPoint,
    pub costing: String,
}

/// Budget bookkeeping for automatic reroutes.
#[derive(Debug, Clone)]
pub struct RerouteController {
    initial_budget: u32,
}

impl RerouteController {
    pub fn new(initial_budget: u32) -> Self {
        Self { initial_budget }
    }

    /// Refill the session's attempt budget (navigation start, manual reroute).
    pub fn reset_budget(&self, session: &mut NavigationSession) {
        session.reroute_attempts_remaining = self.initial_budget;
    }

    /// Launch a reroute if the budget allows, decrementing at launch.
    ///
    /// Returns `None` when the budget is exhausted; the caller stays
    /// `OffRoute` until the agent returns within threshold or the user
    /// forces a manual reroute.
    pub fn try_launch(
        &self,
        session: &mut NavigationSession,
        from: GpsPoint,
        costing: &str,
    ) -> Option<FetchCommand> {
        if session.reroute_attempts_remaining == 0 {
            debug!("reroute budget exhausted, staying off-route");
            return None;
        }
        let to = session.destination?;

        session.reroute_attempts_remaining -= 1;
        debug!(
            "launching reroute, {} attempts remaining",
            session.reroute_attempts_remaining
        );

        Some(FetchCommand {
            generation: session.generation,
            from,
            to,
            costing: costing.to_string(),
        })
    }

    /// Stale-result guard: a fetch result is only applicable when its
    /// generation matches the session's current generation.
    pub fn accepts(&self, session: &NavigationSession, generation: u64) -> bool {
        session.generation == generation
    }
}
