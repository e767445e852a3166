//! redb table definitions for snapshot persistence.

use redb::TableDefinition;

/// Current universe snapshots keyed by `{universe_id}`, JSON values.
pub const UNIVERSES: TableDefinition<&str, &[u8]> = TableDefinition::new("universes");
