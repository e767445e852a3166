//! Topology query service — endpoint projections over a snapshot.
//!
//! Each query loads exactly one snapshot and projects it into an
//! endpoint list, so results never straddle a version boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::ownership::OwnershipIndex;
use crate::store::UniverseStore;
use crate::types::{NodeRecord, NodeState, UniverseSnapshot};

/// One discoverable endpoint, as served to clients.
///
/// `private_ip` keeps its wire name for compatibility with existing
/// client bootstrap code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub name: String,
    pub private_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    pub port: u16,
}

/// Read API over the universe store, scoped or unscoped by customer.
#[derive(Clone)]
pub struct TopologyQuery {
    store: UniverseStore,
    ownership: OwnershipIndex,
}

impl TopologyQuery {
    pub fn new(store: UniverseStore, ownership: OwnershipIndex) -> Self {
        Self { store, ownership }
    }

    /// Running master endpoints of a universe, sorted by node name.
    ///
    /// `NotFound` for an unknown universe; an empty vec (not an error)
    /// when the universe has no running masters, so that clients can
    /// tell "unknown cluster" from "cluster with nothing ready yet".
    pub fn list_masters(&self, universe_id: &str) -> RegistryResult<Vec<EndpointRecord>> {
        let snapshot = self.store.get(universe_id)?;
        Ok(project(&snapshot, |n| n.is_master, |n| n.ports.master_rpc))
    }

    /// Running query-layer (YQL) endpoints of a universe, sorted by name.
    pub fn list_query_servers(&self, universe_id: &str) -> RegistryResult<Vec<EndpointRecord>> {
        let snapshot = self.store.get(universe_id)?;
        Ok(project(&snapshot, |n| n.is_query_server, |n| n.ports.yql))
    }

    /// Customer-scoped variant of [`Self::list_masters`].
    pub fn list_masters_scoped(
        &self,
        customer_id: &str,
        universe_id: &str,
    ) -> RegistryResult<Vec<EndpointRecord>> {
        self.check_scope(customer_id, universe_id)?;
        self.list_masters(universe_id)
    }

    /// Customer-scoped variant of [`Self::list_query_servers`].
    pub fn list_query_servers_scoped(
        &self,
        customer_id: &str,
        universe_id: &str,
    ) -> RegistryResult<Vec<EndpointRecord>> {
        self.check_scope(customer_id, universe_id)?;
        self.list_query_servers(universe_id)
    }

    /// Customer-scoped snapshot read.
    pub fn snapshot_scoped(
        &self,
        customer_id: &str,
        universe_id: &str,
    ) -> RegistryResult<Arc<UniverseSnapshot>> {
        self.check_scope(customer_id, universe_id)?;
        self.store.get(universe_id)
    }

    /// `NotFound` for an unknown universe, `Forbidden` (carrying a
    /// not-found style message, so existence does not leak) for a
    /// universe owned by a different customer.
    fn check_scope(&self, customer_id: &str, universe_id: &str) -> RegistryResult<()> {
        // Unknown ids surface as NotFound before the ownership check.
        self.store.get(universe_id)?;
        if !self.ownership.authorize(customer_id, universe_id) {
            return Err(RegistryError::Forbidden(format!(
                "universe {universe_id} not found"
            )));
        }
        Ok(())
    }
}

fn project(
    snapshot: &UniverseSnapshot,
    role: impl Fn(&NodeRecord) -> bool,
    port: impl Fn(&NodeRecord) -> u16,
) -> Vec<EndpointRecord> {
    // Snapshot nodes are kept sorted by name, so the projection is too.
    snapshot
        .nodes
        .iter()
        .filter(|n| n.state == NodeState::Running && role(n))
        .map(|n| EndpointRecord {
            name: n.name.clone(),
            private_ip: n.private_ip.clone(),
            public_ip: n.public_ip.clone(),
            port: port(n),
        })
        .collect()
}
