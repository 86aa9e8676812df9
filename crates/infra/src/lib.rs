//! Storage and plumbing behind the order service: the event store, the
//! command dispatcher, the orders projection and the worker feeding it.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod workers;
