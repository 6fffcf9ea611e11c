//! Cache storage: named generations of stored response snapshots.
//!
//! A store holds any number of named generations, each a key-value map from
//! request identity to a response snapshot. Lookups search every generation
//! (writes target exactly one); whole generations are deleted at activation.
//! Per-key operations are atomic and last-writer-wins; no cross-key
//! transactions are offered or used.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CacheStore, CachedResponse};
