//! Disposable query-side storage, partitioned by company.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
