//! Read models derived from published order events.
//!
//! Dropping and replaying the event store must reproduce them exactly, and
//! applying the same envelope twice must be harmless.

pub mod orders;

pub use orders::{OrderProjectionError, OrderReadModel, OrdersProjection};
