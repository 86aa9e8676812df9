use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use flowgic_core::{AggregateId, CompanyId, ExpectedVersion};
use flowgic_events::EventEnvelope;

/// A decided event that has not been given a stream position yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Serialize a typed order event and copy its metadata alongside.
    pub fn from_typed<E>(
        company_id: CompanyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: flowgic_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("cannot encode payload: {e}")))?;

        Ok(Self {
            event_id,
            company_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().into(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    fn committed_at(self, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            company_id: self.company_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            sequence_number,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// An event at its final position. Positions start at 1 per stream and
/// never skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub sequence_number: u64,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.event_id,
            self.company_id,
            self.aggregate_id,
            self.aggregate_type.as_str(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

pub(crate) fn commit(batch: Vec<UncommittedEvent>, after: u64) -> Vec<StoredEvent> {
    batch
        .into_iter()
        .zip(after + 1..)
        .map(|(event, seq)| event.committed_at(seq))
        .collect()
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("company isolation violation: {0}")]
    TenantIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Storage contract for order streams.
///
/// A batch passed to `append` lands whole or not at all, and only when the
/// stream is at `expected_version`.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Empty for an order that was never created.
    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Everything one company has, across all streams.
    fn load_company(&self, company_id: CompanyId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        S::append(self, events, expected_version)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        S::load_stream(self, company_id, aggregate_id)
    }

    fn load_company(&self, company_id: CompanyId) -> Result<Vec<StoredEvent>, EventStoreError> {
        S::load_company(self, company_id)
    }
}
