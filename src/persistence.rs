//! Durable session storage.
//!
//! The engine writes a [`PersistedSession`] record after every accepted
//! mutation so a process restart can reconstruct the session without
//! re-fetching the route. Hosts choose the backing store:
//!
//! - [`MemorySessionStore`] — process-local, for tests and hosts that bring
//!   their own durability.
//! - [`SqliteSessionStore`] — single-row SQLite record (feature
//!   `persistence`, enabled by default).

use crate::engine::session::PersistedSession;
use crate::error::Result;

/// Durable key-value record for the navigation session.
pub trait SessionStore {
    /// Overwrite the stored session record.
    fn save(&mut self, session: &PersistedSession) -> Result<()>;
    /// Load the stored record, if any.
    fn load(&mut self) -> Result<Option<PersistedSession>>;
    /// Remove the stored record.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Option<PersistedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, session: &PersistedSession) -> Result<()> {
        self.record = Some(session.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<PersistedSession>> {
        Ok(self.record.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.record = None;
        Ok(())
    }
}

#[cfg(feature = "persistence")]
pub use sqlite::SqliteSessionStore;

#[cfg(feature = "persistence")]
mod sqlite {
    use rusqlite::{params, Connection, OptionalExtension};

    use super::SessionStore;
    use crate::engine::session::{NavigationState, PersistedSession};
    use crate::error::Result;
    use crate::{GpsPoint, LocationFix};

    /// SQLite-backed session store holding a single row.
    ///
    /// The route and last fix are stored as JSON columns; scalar fields get
    /// their own columns so the record stays inspectable with the sqlite CLI.
    pub struct SqliteSessionStore {
        conn: Connection,
    }

    impl SqliteSessionStore {
        /// Open (or create) the store at the given path.
        pub fn open(path: &str) -> Result<Self> {
            let conn = Connection::open(path)?;
            Self::with_connection(conn)
        }

        /// In-memory database, used by tests.
        pub fn open_in_memory() -> Result<Self> {
            let conn = Connection::open_in_memory()?;
            Self::with_connection(conn)
        }

        fn with_connection(conn: Connection) -> Result<Self> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS nav_session (
                    id INTEGER PRIMARY KEY CHECK (id = 0),
                    state TEXT NOT NULL,
                    route TEXT,
                    progress_index INTEGER NOT NULL,
                    reroute_attempts_remaining INTEGER NOT NULL,
                    last_fix TEXT,
                    destination TEXT
                )",
                [],
            )?;
            Ok(Self { conn })
        }
    }

    impl SessionStore for SqliteSessionStore {
        fn save(&mut self, session: &PersistedSession) -> Result<()> {
            let state = serde_json::to_string(&session.state)?;
            let route = session
                .route
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let last_fix = session
                .last_fix
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let destination = session
                .destination
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            self.conn.execute(
                "INSERT OR REPLACE INTO nav_session
                 (id, state, route, progress_index, reroute_attempts_remaining, last_fix, destination)
                 VALUES (0, ?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    state,
                    route,
                    session.progress_index as i64,
                    session.reroute_attempts_remaining as i64,
                    last_fix,
                    destination,
                ],
            )?;
            Ok(())
        }

        fn load(&mut self) -> Result<Option<PersistedSession>> {
            let row = self
                .conn
                .query_row(
                    "SELECT state, route, progress_index, reroute_attempts_remaining,
                            last_fix, destination
                     FROM nav_session WHERE id = 0",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                        ))
                    },
                )
                .optional()?;

            let Some((state, route, progress, attempts, last_fix, destination)) = row else {
                return Ok(None);
            };

            let state: NavigationState = serde_json::from_str(&state)?;
            let route = route
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            let last_fix: Option<LocationFix> = last_fix
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            let destination: Option<GpsPoint> = destination
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;

            Ok(Some(PersistedSession {
                state,
                route,
                progress_index: progress as usize,
                reroute_attempts_remaining: attempts as u32,
                last_fix,
                destination,
            }))
        }

        fn clear(&mut self) -> Result<()> {
            self.conn.execute("DELETE FROM nav_session", [])?;
            Ok(())
        }
    }
}
