use chrono::{DateTime, Utc};

/// Metadata every persisted domain event exposes to the event store.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name stored alongside the payload, e.g.
    /// `"logistics.order.payment_updated"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema revision.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
