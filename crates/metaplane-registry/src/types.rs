//! Domain types for the topology registry.
//!
//! A [`UniverseSnapshot`] is an immutable, versioned description of one
//! universe's membership. Node records are shared by `Arc` between
//! snapshot versions, so producing version N+1 only clones the records
//! the transform actually touched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Stable identifier of a universe (one managed database cluster).
pub type UniverseId = String;

/// Identifier of the customer owning a universe.
pub type CustomerId = String;

// ── Node ──────────────────────────────────────────────────────────

/// Lifecycle state of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Provisioning,
    Running,
    Decommissioned,
}

/// Well-known ports exposed by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePorts {
    /// Master (metadata quorum) RPC port.
    pub master_rpc: u16,
    /// YQL query-layer port.
    pub yql: u16,
}

impl Default for NodePorts {
    fn default() -> Self {
        Self {
            master_rpc: 7100,
            yql: 9042,
        }
    }
}

/// One cluster member and its roles, state, and network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name, unique within its snapshot.
    pub name: String,
    /// Participates in the metadata/consensus quorum.
    pub is_master: bool,
    /// Serves client query-protocol (YQL) traffic.
    pub is_query_server: bool,
    pub state: NodeState,
    pub private_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    pub ports: NodePorts,
}

// ── Replication intent ────────────────────────────────────────────

/// Fault-tolerance policy requested for a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultTolerance {
    None,
    Zone,
    Region,
}

/// Cluster-wide placement intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationIntent {
    /// Target master count (replication factor). Must be at least 1.
    pub replication_factor: u32,
    pub fault_tolerance: FaultTolerance,
}

impl ReplicationIntent {
    /// Validate the intent before it is installed in a snapshot.
    pub fn validate(&self) -> RegistryResult<()> {
        if self.replication_factor == 0 {
            return Err(RegistryError::InvalidArgument(
                "replication factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Immutable, versioned view of one universe's topology.
///
/// Snapshots are never mutated in place. The `with_*` / `without_*`
/// helpers produce a modified copy suitable for returning from an
/// update transform; [`crate::UniverseStore`] assigns the version and
/// preserves identity and ownership on install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseSnapshot {
    pub universe_id: UniverseId,
    /// Monotonically increasing, starts at 1 on creation.
    pub version: u64,
    /// Owner, immutable after creation.
    pub customer_id: CustomerId,
    /// Node records sorted ascending by name. Shared across versions.
    pub nodes: Vec<Arc<NodeRecord>>,
    pub intent: ReplicationIntent,
}

impl UniverseSnapshot {
    /// Initial snapshot (version 1, empty node set) for a new universe.
    pub fn initial(
        universe_id: impl Into<UniverseId>,
        customer_id: impl Into<CustomerId>,
        intent: ReplicationIntent,
    ) -> Self {
        Self {
            universe_id: universe_id.into(),
            version: 1,
            customer_id: customer_id.into(),
            nodes: Vec::new(),
            intent,
        }
    }

    /// Look up a node record by name.
    pub fn node(&self, name: &str) -> Option<&Arc<NodeRecord>> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Copy of this snapshot with `record` added, keeping the node set
    /// sorted by name. Fails if the name is already taken.
    pub fn with_node(&self, record: NodeRecord) -> RegistryResult<Self> {
        if self.node(&record.name).is_some() {
            return Err(RegistryError::InvalidArgument(format!(
                "node {} already exists in universe {}",
                record.name, self.universe_id
            )));
        }
        let mut next = self.clone();
        let idx = next
            .nodes
            .partition_point(|n| n.name.as_str() < record.name.as_str());
        next.nodes.insert(idx, Arc::new(record));
        Ok(next)
    }

    /// Copy of this snapshot with the named node removed.
    pub fn without_node(&self, name: &str) -> RegistryResult<Self> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "node {name} not found in universe {}",
                    self.universe_id
                ))
            })?;
        let mut next = self.clone();
        next.nodes.remove(idx);
        Ok(next)
    }

    /// Copy of this snapshot with the named node replaced by the result
    /// of `mutate` applied to a clone of its record.
    pub fn with_node_updated(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut NodeRecord),
    ) -> RegistryResult<Self> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "node {name} not found in universe {}",
                    self.universe_id
                ))
            })?;
        let mut record = (*self.nodes[idx]).clone();
        mutate(&mut record);
        if record.name != name {
            return Err(RegistryError::InvalidArgument(
                "node records cannot be renamed".to_string(),
            ));
        }
        let mut next = self.clone();
        next.nodes[idx] = Arc::new(record);
        Ok(next)
    }

    /// Copy of this snapshot with a new replication intent.
    pub fn with_intent(&self, intent: ReplicationIntent) -> RegistryResult<Self> {
        intent.validate()?;
        let mut next = self.clone();
        next.intent = intent;
        Ok(next)
    }
}
