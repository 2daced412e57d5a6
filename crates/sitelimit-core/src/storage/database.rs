//! SQLite-backed persistence for the budget record.
//!
//! The store contract is deliberately small: load whatever subset of the
//! record exists, and write the full record back in a single call. Per-call
//! atomicity of one write is the only guarantee the engine relies on, which
//! is why every save serializes the complete record into one kv row instead
//! of touching fields individually.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};

use super::data_dir;
use crate::budget::{BudgetState, StoredState};
use crate::error::StoreError;

const STATE_KEY: &str = "budget_state";

/// Durable mapping from named fields to values.
///
/// `load` never fails the caller over missing data -- an empty store is an
/// all-absent record. `save` is best-effort: callers log and carry on with
/// in-memory state when it fails.
pub trait StateStore: Send {
    fn load(&self) -> Result<StoredState, StoreError>;
    fn save(&self, state: &BudgetState) -> Result<(), StoreError>;
}

/// SQLite database holding the persisted budget record.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/sitelimit/sitelimit.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .join("sitelimit.db");
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(StoreError::from)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl StateStore for Database {
    fn load(&self) -> Result<StoredState, StoreError> {
        match self.kv_get(STATE_KEY)? {
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| StoreError::Corrupt(e.to_string()))
            }
            None => Ok(StoredState::default()),
        }
    }

    fn save(&self, state: &BudgetState) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.kv_set(STATE_KEY, &json)
    }
}

/// In-memory store, shared by clones. Backs tests and the simulator with
/// the same record format the SQLite store persists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last persisted record, decoded. `None` when nothing was saved.
    pub fn persisted(&self) -> Option<BudgetState> {
        let guard = self.record.lock().ok()?;
        let json = guard.as_ref()?;
        serde_json::from_str(json).ok()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<StoredState, StoreError> {
        let guard = self
            .record
            .lock()
            .map_err(|_| StoreError::QueryFailed("store mutex poisoned".into()))?;
        match guard.as_ref() {
            Some(json) => {
                serde_json::from_str(json).map_err(|e| StoreError::Corrupt(e.to_string()))
            }
            None => Ok(StoredState::default()),
        }
    }

    fn save(&self, state: &BudgetState) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut guard = self
            .record
            .lock()
            .map_err(|_| StoreError::QueryFailed("store mutex poisoned".into()))?;
        *guard = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("missing").unwrap().is_none());
        db.kv_set("greeting", "hello").unwrap();
        assert_eq!(db.kv_get("greeting").unwrap().unwrap(), "hello");
        db.kv_set("greeting", "replaced").unwrap();
        assert_eq!(db.kv_get("greeting").unwrap().unwrap(), "replaced");
    }

    #[test]
    fn empty_store_loads_as_all_absent() {
        let db = Database::open_memory().unwrap();
        let stored = db.load().unwrap();
        assert!(stored.enabled.is_none());
        assert!(stored.time_left.is_none());
        assert!(stored.last_reset_date.is_none());
    }

    #[test]
    fn full_record_roundtrips_through_sqlite() {
        let db = Database::open_memory().unwrap();
        let state = BudgetState {
            tracked_sites: ["example.com".to_string()].into(),
            initial_time: 3600,
            time_left: 1200,
            timer_active: true,
            ..BudgetState::default()
        };
        db.save(&state).unwrap();
        let stored = db.load().unwrap();
        assert_eq!(stored.time_left, Some(1200));
        assert_eq!(stored.initial_time, Some(3600));
        assert_eq!(stored.timer_active, Some(true));
        assert_eq!(BudgetState::from_stored(&stored), state);
    }

    #[test]
    fn corrupt_record_is_reported_not_swallowed() {
        let db = Database::open_memory().unwrap();
        db.kv_set("budget_state", "{not json").unwrap();
        assert!(matches!(db.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn memory_store_shares_record_across_clones() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save(&BudgetState::default()).unwrap();
        assert!(other.persisted().is_some());
    }
}
