//! Storage backends
//!
//! The correlation core talks to storage only through the `CorrelationStore`
//! trait. `SqliteStore` is the persistent backend; `MemoryStore` serves tests
//! and dry runs.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CorrelationStore, OpenStore, StoreError, StoreResult};
