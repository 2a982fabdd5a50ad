//! Track-logger collaborator boundary.
//!
//! The engine calls `append` for every accepted fix while a session is
//! active and `start`/`stop` on entering/leaving active navigation. The
//! actual track-file writing (GPX or otherwise) lives outside this crate.

use std::sync::{Arc, Mutex};

use crate::LocationFix;

/// Sequential track recording collaborator.
pub trait TrackLogger {
    fn start(&mut self);
    fn append(&mut self, fix: &LocationFix);
    fn stop(&mut self);
}

/// Discards everything; the default when the host does not record tracks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrackLogger;

impl TrackLogger for NullTrackLogger {
    fn start(&mut self) {}
    fn append(&mut self, _fix: &LocationFix) {}
    fn stop(&mut self) {}
}

/// Shared in-memory recorder for tests: clones observe the same log.
#[derive(Debug, Default, Clone)]
pub struct MemoryTrackLogger {
    inner: Arc<Mutex<MemoryTrackLog>>,
}

#[derive(Debug, Default)]
pub struct MemoryTrackLog {
    pub fixes: Vec<LocationFix>,
    pub starts: u32,
    pub stops: u32,
}

impl MemoryTrackLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fix_count(&self) -> usize {
        self.inner.lock().map(|log| log.fixes.len()).unwrap_or(0)
    }

    pub fn starts(&self) -> u32 {
        self.inner.lock().map(|log| log.starts).unwrap_or(0)
    }

    pub fn stops(&self) -> u32 {
        self.inner.lock().map(|log| log.stops).unwrap_or(0)
    }
}

impl TrackLogger for MemoryTrackLogger {
    fn start(&mut self) {
        if let Ok(mut log) = self.inner.lock() {
            log.starts += 1;
        }
    }

    fn append(&mut self, fix: &LocationFix) {
        if let Ok(mut log) = self.inner.lock() {
            log.fixes.push(*fix);
        }
    }

    fn stop(&mut self) {
        if let Ok(mut log) = self.inner.lock() {
            log.stops += 1;
        }
    }
}
