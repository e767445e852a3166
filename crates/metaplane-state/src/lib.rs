//! metaplane-state — embedded snapshot persistence for the registry.
//!
//! Backed by [redb](https://docs.rs/redb). Universe snapshots are
//! JSON-serialized into a single `&str -> &[u8]` table keyed by
//! universe id; only the current version of each universe is kept, so
//! a save overwrites the prior row.
//!
//! The store implements the registry's `SnapshotSink` trait
//! (save-on-update / remove-on-delete) and provides `load_universes`
//! for startup hydration. It is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`).

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StorageError, StorageResult};
pub use store::SnapshotStore;
