//! Shared primitives for the flowgic order service: typed ids, the domain
//! error, and the aggregate contract the logistics crate implements.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CompanyId, UserId};
