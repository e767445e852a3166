//! SnapshotStore — redb-backed persistence for universe snapshots.
//!
//! One row per universe holding the latest snapshot as JSON. The
//! in-memory backend exists for tests; the daemon uses the on-disk
//! backend and hydrates the registry from `load_universes` at startup.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use metaplane_registry::{SnapshotSink, UniverseSnapshot};

use crate::error::{StorageError, StorageResult};
use crate::tables::UNIVERSES;

/// Convert any `Display` error into a `StorageError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StorageError::$variant(e.to_string())
    };
}

/// Thread-safe snapshot store backed by redb.
#[derive(Clone)]
pub struct SnapshotStore {
    db: Arc<Database>,
}

impl SnapshotStore {
    /// Open (or create) a persistent snapshot store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "snapshot store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory snapshot store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory snapshot store opened");
        Ok(store)
    }

    /// Create the table if it doesn't exist yet.
    fn ensure_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(UNIVERSES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or overwrite the snapshot row for its universe.
    pub fn save_snapshot(&self, snapshot: &UniverseSnapshot) -> StorageResult<()> {
        let value = serde_json::to_vec(snapshot).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(UNIVERSES).map_err(map_err!(Table))?;
            table
                .insert(snapshot.universe_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(universe_id = %snapshot.universe_id, version = snapshot.version, "snapshot saved");
        Ok(())
    }

    /// Get the stored snapshot for a universe, if any.
    pub fn get_snapshot(&self, universe_id: &str) -> StorageResult<Option<UniverseSnapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UNIVERSES).map_err(map_err!(Table))?;
        match table.get(universe_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let snapshot: UniverseSnapshot =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Load all stored snapshots (startup hydration).
    pub fn load_universes(&self) -> StorageResult<Vec<UniverseSnapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UNIVERSES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let snapshot: UniverseSnapshot =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(snapshot);
        }
        Ok(results)
    }

    /// Delete the snapshot row for a universe. Returns true if it existed.
    pub fn remove_snapshot(&self, universe_id: &str) -> StorageResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(UNIVERSES).map_err(map_err!(Table))?;
            existed = table.remove(universe_id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(universe_id, existed, "snapshot removed");
        Ok(existed)
    }
}

impl SnapshotSink for SnapshotStore {
    fn save(&self, snapshot: &UniverseSnapshot) -> anyhow::Result<()> {
        self.save_snapshot(snapshot)?;
        Ok(())
    }

    fn remove(&self, universe_id: &str) -> anyhow::Result<()> {
        self.remove_snapshot(universe_id)?;
        Ok(())
    }
}
