//! UniverseStore — current snapshot per universe, with optimistic updates.
//!
//! Each universe maps to an `ArcSwap<UniverseSnapshot>` holding the
//! current version. `get` is a lock-free pointer load; `update` runs a
//! read-transform-compare-and-swap loop so concurrent writers on the
//! same universe serialize through version conflicts instead of a held
//! lock. The outer map is only locked for the instant it takes to look
//! up or insert a universe slot, never across a transform.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::types::{CustomerId, ReplicationIntent, UniverseId, UniverseSnapshot};

/// Retry budget for the optimistic update loop before surfacing `Conflict`.
const MAX_UPDATE_RETRIES: usize = 5;

/// Save-on-update / remove-on-delete hooks for a persistence collaborator.
///
/// Failures are logged by the store and never fail the in-memory
/// operation; the registry stays serviceable if storage misbehaves.
pub trait SnapshotSink: Send + Sync {
    fn save(&self, snapshot: &UniverseSnapshot) -> anyhow::Result<()>;
    fn remove(&self, universe_id: &str) -> anyhow::Result<()>;
}

type Slot = Arc<ArcSwap<UniverseSnapshot>>;

/// Thread-safe store of the current snapshot per universe.
///
/// `Clone` is cheap; all clones share the same underlying map and can be
/// handed to readers and writers across tasks.
#[derive(Clone, Default)]
pub struct UniverseStore {
    universes: Arc<RwLock<HashMap<UniverseId, Slot>>>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl UniverseStore {
    /// Create an empty store with no persistence hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a persistence sink invoked after every successful install.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Install pre-loaded snapshots, e.g. from storage at startup.
    ///
    /// Existing entries for the same universe id are replaced.
    pub fn hydrate(&self, snapshots: impl IntoIterator<Item = UniverseSnapshot>) {
        let mut map = self
            .universes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for snapshot in snapshots {
            debug!(universe_id = %snapshot.universe_id, version = snapshot.version, "hydrated universe");
            map.insert(
                snapshot.universe_id.clone(),
                Arc::new(ArcSwap::from_pointee(snapshot)),
            );
        }
    }

    /// Register a new universe at version 1 with an empty node set.
    pub fn create(
        &self,
        universe_id: &str,
        customer_id: &str,
        intent: ReplicationIntent,
    ) -> RegistryResult<Arc<UniverseSnapshot>> {
        validate_id(universe_id, "universe id")?;
        validate_id(customer_id, "customer id")?;
        intent.validate()?;

        let snapshot = Arc::new(UniverseSnapshot::initial(universe_id, customer_id, intent));
        {
            let mut map = self
                .universes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if map.contains_key(universe_id) {
                return Err(RegistryError::InvalidArgument(format!(
                    "universe {universe_id} already exists"
                )));
            }
            map.insert(
                universe_id.to_string(),
                Arc::new(ArcSwap::new(snapshot.clone())),
            );
            // Persist while still holding the map lock: a concurrent
            // delete cannot remove the entry (and then the storage row)
            // until this save has landed.
            self.persist(&snapshot);
        }
        debug!(universe_id, customer_id, "universe created");
        Ok(snapshot)
    }

    /// Current snapshot of a universe. Lock-free on the snapshot pointer.
    pub fn get(&self, universe_id: &str) -> RegistryResult<Arc<UniverseSnapshot>> {
        Ok(self.slot(universe_id)?.load_full())
    }

    /// Apply `transform` to the current snapshot and install the result
    /// as the next version.
    ///
    /// The transform must be a pure function of its input: on a lost
    /// race it is re-run against the latest snapshot, up to
    /// [`MAX_UPDATE_RETRIES`] times before `Conflict` is surfaced.
    /// Identity, owner, and version of the candidate are overwritten by
    /// the store, so a transform cannot forge them. A universe deleted
    /// while the update is in flight yields `NotFound`; nothing is
    /// installed or persisted for it.
    pub fn update<F>(&self, universe_id: &str, transform: F) -> RegistryResult<Arc<UniverseSnapshot>>
    where
        F: Fn(&UniverseSnapshot) -> RegistryResult<UniverseSnapshot>,
    {
        let slot = self.slot(universe_id)?;
        for attempt in 0..MAX_UPDATE_RETRIES {
            let current = slot.load_full();
            let mut candidate = transform(&current)?;
            candidate.universe_id = current.universe_id.clone();
            candidate.customer_id = current.customer_id.clone();
            candidate.version = current.version + 1;

            let next = Arc::new(candidate);
            let prev = slot.compare_and_swap(&current, next.clone());
            if Arc::ptr_eq(&prev, &current) {
                // The CAS can win on a slot that a concurrent delete has
                // already unregistered. Re-check registration and persist
                // under the map read lock, so delete's storage removal is
                // ordered after any save that passes the check.
                let map = self
                    .universes
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                let registered = map
                    .get(universe_id)
                    .is_some_and(|s| Arc::ptr_eq(s, &slot));
                if !registered {
                    return Err(RegistryError::unknown_universe(universe_id));
                }
                self.persist(&next);
                drop(map);
                debug!(universe_id, version = next.version, attempt, "universe updated");
                return Ok(next);
            }
            debug!(universe_id, attempt, "update lost the race, retrying");
        }
        Err(RegistryError::Conflict(format!(
            "universe {universe_id}: update contended past {MAX_UPDATE_RETRIES} retries"
        )))
    }

    /// Remove a universe. Terminal: a later `create` with the same id
    /// starts over at version 1.
    pub fn delete(&self, universe_id: &str) -> RegistryResult<()> {
        let removed = self
            .universes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(universe_id);
        if removed.is_none() {
            return Err(RegistryError::unknown_universe(universe_id));
        }
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.remove(universe_id) {
                warn!(universe_id, error = %e, "failed to remove universe from storage");
            }
        }
        debug!(universe_id, "universe deleted");
        Ok(())
    }

    /// Ids of all registered universes (test and admin tooling).
    pub fn universe_ids(&self) -> Vec<UniverseId> {
        self.universes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Owner of a universe, if registered.
    pub fn owner_of(&self, universe_id: &str) -> Option<CustomerId> {
        self.slot(universe_id)
            .ok()
            .map(|slot| slot.load().customer_id.clone())
    }

    fn slot(&self, universe_id: &str) -> RegistryResult<Slot> {
        self.universes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(universe_id)
            .cloned()
            .ok_or_else(|| RegistryError::unknown_universe(universe_id))
    }

    fn persist(&self, snapshot: &UniverseSnapshot) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.save(snapshot) {
                warn!(
                    universe_id = %snapshot.universe_id,
                    version = snapshot.version,
                    error = %e,
                    "failed to persist snapshot"
                );
            }
        }
    }
}

fn validate_id(id: &str, what: &str) -> RegistryResult<()> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidArgument(format!(
            "malformed {what}: {id:?}"
        )));
    }
    Ok(())
}
