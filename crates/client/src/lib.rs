//! `flowgic-client`: the order page update controller.
//!
//! Turns two user gestures (picking a status, submitting the cost form)
//! into server calls and reconciles the page only from server-confirmed
//! data. Rendering is left to the embedding UI; this crate owns the state.

pub mod config;
pub mod controller;
pub mod message;
pub mod page;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, Messages};
pub use controller::{OrderUpdateController, UpdateOutcome};
pub use message::{Message, MessageBanner, Tone};
pub use page::{FinancialForm, OrderPage, ProfitDisplay, StatusBadge, StatusSelect};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::{RequestBody, UpdateRequest, UpdateResponse};
