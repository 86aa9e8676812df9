//! Runs one order command end to end.
//!
//! ```text
//! load stream -> replay -> handle -> append(Exact(version)) -> publish
//!                  ^                        |
//!                  +------ conflict --------+
//! ```
//!
//! Overlapping commands on one order resolve last-write-wins: a writer that
//! loses the version race replays the newer stream and decides again, up to
//! `max_retries` times.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use flowgic_core::{Aggregate, AggregateId, CompanyId, DomainError, ExpectedVersion};
use flowgic_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure that survived every retry.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// Cross-company or cross-aggregate stream mixing.
    #[error("company isolation violation: {0}")]
    TenantIsolation(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// Historical payloads did not match the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error("event store error: {0}")]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Result of a successful command: the aggregate after the new events were
/// applied, plus what was committed (empty for no-op commands).
#[derive(Debug, Clone)]
pub struct Dispatched<A> {
    pub aggregate: A,
    pub committed: Vec<StoredEvent>,
}

/// Reusable command execution engine.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    max_retries: u32,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Retries after a lost version race (0 disables retrying).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rehydrate an aggregate without handling a command.
    pub fn load<A>(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(CompanyId, AggregateId) -> A,
    ) -> Result<(A, Vec<StoredEvent>), DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(company_id, aggregate_id)?;
        validate_loaded_stream(company_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(company_id, aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok((aggregate, history))
    }

    /// Dispatch a command and return the resulting aggregate state.
    pub fn execute<A>(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl Fn(CompanyId, AggregateId) -> A,
    ) -> Result<Dispatched<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: flowgic_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate_type = aggregate_type.into();
        let mut attempt = 0u32;

        loop {
            let (mut aggregate, history) = self.load(company_id, aggregate_id, &make_aggregate)?;
            let expected = ExpectedVersion::Exact(stream_version(&history));

            let decided = aggregate.handle(&command)?;
            if decided.is_empty() {
                return Ok(Dispatched {
                    aggregate,
                    committed: vec![],
                });
            }

            let uncommitted = decided
                .iter()
                .map(|ev| {
                    UncommittedEvent::from_typed(
                        company_id,
                        aggregate_id,
                        aggregate_type.clone(),
                        Uuid::now_v7(),
                        ev,
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;

            let committed = match self.store.append(uncommitted, expected) {
                Ok(committed) => committed,
                Err(EventStoreError::Concurrency(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(%company_id, %aggregate_id, attempt, %msg, "lost version race; retrying");
                    continue;
                }
                Err(EventStoreError::Concurrency(msg)) => {
                    warn!(%company_id, %aggregate_id, attempts = attempt + 1, "giving up after repeated conflicts");
                    return Err(DispatchError::Concurrency(msg));
                }
                Err(e) => return Err(e.into()),
            };

            for ev in &decided {
                aggregate.apply(ev);
            }

            // Only after the append succeeded; a failed publish is logged, not returned.
            for stored in &committed {
                if let Err(e) = self.bus.publish(stored.to_envelope()) {
                    warn!(
                        %company_id,
                        %aggregate_id,
                        sequence = stored.sequence_number,
                        error = ?e,
                        "event publication failed after commit"
                    );
                }
            }

            return Ok(Dispatched {
                aggregate,
                committed,
            });
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map_or(0, |e| e.sequence_number)
}

fn validate_loaded_stream(
    company_id: CompanyId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.company_id != company_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong company_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number != last + 1 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "stream gap: expected sequence {}, found {}",
                last + 1,
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use flowgic_core::{AggregateRoot, UserId};
    use flowgic_events::{InMemoryEventBus, Subscription};
    use flowgic_logistics::{
        AGGREGATE_TYPE, ChangeStatus, CreateOrder, Order, OrderCommand, OrderEvent, OrderId,
        OrderStatus, Shipment, StatusChanged,
    };

    use super::*;
    use crate::event_store::InMemoryEventStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn make(_: CompanyId, id: AggregateId) -> Order {
        Order::empty(OrderId::new(id))
    }

    fn create(company_id: CompanyId, id: AggregateId) -> OrderCommand {
        OrderCommand::CreateOrder(CreateOrder {
            company_id,
            order_id: OrderId::new(id),
            created_by: UserId::new(),
            shipment: Shipment {
                cargo_type: "Steel".into(),
                cargo_mass_kg: Decimal::from_str("900").unwrap(),
                origin: "A".into(),
                destination: "B".into(),
                ..Default::default()
            },
            occurred_at: Utc::now(),
        })
    }

    fn change(company_id: CompanyId, id: AggregateId, status: &str) -> OrderCommand {
        OrderCommand::ChangeStatus(ChangeStatus {
            company_id,
            order_id: OrderId::new(id),
            status: status.into(),
            actor: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn execute_returns_post_apply_state_and_publishes() {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let d = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), bus);
        let (c, id) = (CompanyId::new(), AggregateId::new());

        d.execute(c, id, AGGREGATE_TYPE, create(c, id), make).unwrap();
        let out = d
            .execute(c, id, AGGREGATE_TYPE, change(c, id, "loading"), make)
            .unwrap();

        assert_eq!(out.aggregate.status(), OrderStatus::Loading);
        assert_eq!(out.committed.len(), 1);
        assert_eq!(out.committed[0].event_type, "logistics.order.status_changed");
        assert_eq!(sub.try_recv().unwrap().sequence_number(), 1);
        assert_eq!(sub.try_recv().unwrap().sequence_number(), 2);
    }

    #[test]
    fn domain_rejection_appends_nothing() {
        let store = Arc::new(InMemoryEventStore::new());
        let d = CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()) as Bus);
        let (c, id) = (CompanyId::new(), AggregateId::new());

        assert!(matches!(
            d.execute(c, id, AGGREGATE_TYPE, change(c, id, "loading"), make),
            Err(DispatchError::NotFound)
        ));

        d.execute(c, id, AGGREGATE_TYPE, create(c, id), make).unwrap();
        let err = d
            .execute(c, id, AGGREGATE_TYPE, change(c, id, "created"), make)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(ref m) if m == "Status unchanged"));
        assert_eq!(store.load_stream(c, id).unwrap().len(), 1);
    }

    /// Bus whose every publish fails.
    struct DownBus;

    impl EventBus<EventEnvelope<JsonValue>> for DownBus {
        type Error = &'static str;

        fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            Err("bus down")
        }

        fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
            InMemoryEventBus::new().subscribe()
        }
    }

    #[test]
    fn publish_failure_after_commit_still_succeeds() {
        let store = Arc::new(InMemoryEventStore::new());
        let d = CommandDispatcher::new(store.clone(), DownBus);
        let (c, id) = (CompanyId::new(), AggregateId::new());

        let created = d.execute(c, id, AGGREGATE_TYPE, create(c, id), make).unwrap();
        assert_eq!(created.committed.len(), 1);

        let out = d
            .execute(c, id, AGGREGATE_TYPE, change(c, id, "loading"), make)
            .unwrap();
        assert_eq!(out.aggregate.status(), OrderStatus::Loading);
        assert_eq!(store.load_stream(c, id).unwrap().len(), 2);
    }

    /// Store that lets a competing writer slip in once, right before an append.
    struct RacingStore {
        inner: InMemoryEventStore,
        raced: AtomicBool,
    }

    impl EventStore for RacingStore {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let first = &events[0];
                let competitor = OrderEvent::StatusChanged(StatusChanged {
                    company_id: first.company_id,
                    order_id: OrderId::new(first.aggregate_id),
                    old_status: OrderStatus::Created,
                    new_status: OrderStatus::Delivered,
                    actor: UserId::new(),
                    occurred_at: Utc::now(),
                });
                let competitor = UncommittedEvent::from_typed(
                    first.company_id,
                    first.aggregate_id,
                    AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    &competitor,
                )?;
                self.inner.append(vec![competitor], ExpectedVersion::Any)?;
            }
            self.inner.append(events, expected_version)
        }

        fn load_stream(
            &self,
            company_id: CompanyId,
            aggregate_id: AggregateId,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(company_id, aggregate_id)
        }

        fn load_company(&self, company_id: CompanyId) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_company(company_id)
        }
    }

    #[test]
    fn lost_version_race_is_retried_last_write_wins() {
        let (c, id) = (CompanyId::new(), AggregateId::new());
        let store = Arc::new(RacingStore {
            inner: InMemoryEventStore::new(),
            raced: AtomicBool::new(true),
        });
        let d = CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()) as Bus);
        d.execute(c, id, AGGREGATE_TYPE, create(c, id), make).unwrap();

        store.raced.store(false, Ordering::SeqCst);
        let out = d
            .execute(c, id, AGGREGATE_TYPE, change(c, id, "loading"), make)
            .unwrap();

        assert_eq!(out.aggregate.status(), OrderStatus::Loading);
        assert_eq!(out.aggregate.version(), 3);
        assert_eq!(store.load_stream(c, id).unwrap().len(), 3);
    }

    #[test]
    fn conflicts_surface_when_retries_are_disabled() {
        let (c, id) = (CompanyId::new(), AggregateId::new());
        let store = Arc::new(RacingStore {
            inner: InMemoryEventStore::new(),
            raced: AtomicBool::new(true),
        });
        let d = CommandDispatcher::new(store.clone(), Arc::new(InMemoryEventBus::new()) as Bus)
            .with_max_retries(0);
        d.execute(c, id, AGGREGATE_TYPE, create(c, id), make).unwrap();

        store.raced.store(false, Ordering::SeqCst);
        assert!(matches!(
            d.execute(c, id, AGGREGATE_TYPE, change(c, id, "loading"), make),
            Err(DispatchError::Concurrency(_))
        ));
    }
}
