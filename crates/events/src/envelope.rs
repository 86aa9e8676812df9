use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowgic_core::{AggregateId, CompanyId};

/// A committed event as it travels over the bus.
///
/// `sequence_number` is the stream revision after this event, starting at 1
/// for the creation event of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    company_id: CompanyId,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        company_id: CompanyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            company_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// `"logistics.order"` for everything this service emits.
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
