//! Per-order append-only streams, scoped by company.
//!
//! An order's stream is also its audit log: every accepted mutation lands
//! here before anyone else hears about it.

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use query::{EventFilter, EventQuery, EventQueryResult, Pagination};
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
