//! metaplane-registry — versioned topology registry for managed universes.
//!
//! The registry holds the current [`UniverseSnapshot`] for each managed
//! database cluster ("universe") and answers discovery queries over it:
//! master (metadata-quorum) endpoints and query-layer (YQL) endpoints.
//!
//! # Architecture
//!
//! Snapshots are immutable. Every mutation goes through
//! [`UniverseStore::update`] as a pure `&Snapshot -> Snapshot` transform;
//! the store assigns the next version and installs the result with a
//! compare-and-swap on a per-universe `ArcSwap` pointer. Readers load the
//! current pointer without taking a lock, so a query either sees the old
//! complete snapshot or the new complete snapshot, never a partial update.
//!
//! The crate is purely in-memory. Persistence plugs in through the
//! [`SnapshotSink`] trait (save-on-update / remove-on-delete hooks).

pub mod error;
pub mod ownership;
pub mod query;
pub mod store;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use ownership::OwnershipIndex;
pub use query::{EndpointRecord, TopologyQuery};
pub use store::{SnapshotSink, UniverseStore};
pub use types::*;
