//! Ownership index — which customer owns which universes.
//!
//! Backs the customer-scoped query endpoints. A universe id is owned by
//! at most one customer at a time; the index keeps a reverse map to
//! enforce that without scanning.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{CustomerId, UniverseId};

#[derive(Default)]
struct Maps {
    by_customer: HashMap<CustomerId, BTreeSet<UniverseId>>,
    owner_of: HashMap<UniverseId, CustomerId>,
}

/// Thread-safe customer → universes index.
#[derive(Clone, Default)]
pub struct OwnershipIndex {
    inner: Arc<RwLock<Maps>>,
}

impl OwnershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `customer_id` owns `universe_id`.
    ///
    /// Idempotent for the same pair; fails if the universe is already
    /// owned by a different customer.
    pub fn add_ownership(&self, customer_id: &str, universe_id: &str) -> RegistryResult<()> {
        let mut maps = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(owner) = maps.owner_of.get(universe_id) {
            if owner != customer_id {
                return Err(RegistryError::InvalidArgument(format!(
                    "universe {universe_id} is already owned by another customer"
                )));
            }
            return Ok(());
        }
        maps.owner_of
            .insert(universe_id.to_string(), customer_id.to_string());
        maps.by_customer
            .entry(customer_id.to_string())
            .or_default()
            .insert(universe_id.to_string());
        debug!(customer_id, universe_id, "ownership recorded");
        Ok(())
    }

    /// Drop the ownership entry for `universe_id`, if present.
    pub fn remove_ownership(&self, universe_id: &str) {
        let mut maps = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(owner) = maps.owner_of.remove(universe_id) {
            if let Some(set) = maps.by_customer.get_mut(&owner) {
                set.remove(universe_id);
                if set.is_empty() {
                    maps.by_customer.remove(&owner);
                }
            }
            debug!(universe_id, "ownership removed");
        }
    }

    /// Does `customer_id` own `universe_id`?
    pub fn authorize(&self, customer_id: &str, universe_id: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owner_of
            .get(universe_id)
            .is_some_and(|owner| owner == customer_id)
    }

    /// All universe ids owned by a customer, in id order.
    pub fn universes_of(&self, customer_id: &str) -> Vec<UniverseId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_customer
            .get(customer_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
