//! Storage for payv ledgers.
//!
//! [`MemoryStore`] implements the store traits of `payv-core`. Each unit of
//! work reads from its own copy of the tables; commit validates every written
//! row against the live tables and applies the writes atomically.
//! [`Snapshot`] persists the whole store as versioned JSON.

pub mod memory;
pub mod snapshot;

pub use memory::{MemoryStore, MemoryTransaction};
pub use snapshot::{CategoryRecord, Snapshot, SnapshotError, SCHEMA_VERSION};
