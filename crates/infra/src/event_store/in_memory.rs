use std::collections::HashMap;
use std::sync::RwLock;

use flowgic_core::{AggregateId, CompanyId, ExpectedVersion};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, commit};

type StreamKey = (CompanyId, AggregateId);

/// Process-local store. Holds every stream for the lifetime of the server.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Every event of a batch must address the same stream.
fn batch_stream(events: &[UncommittedEvent]) -> Result<Option<(StreamKey, &str)>, EventStoreError> {
    let Some(head) = events.first() else {
        return Ok(None);
    };
    for (idx, e) in events.iter().enumerate().skip(1) {
        if e.company_id != head.company_id {
            return Err(EventStoreError::TenantIsolation(format!(
                "event {idx} belongs to another company"
            )));
        }
        if e.aggregate_id != head.aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {idx} targets another order"
            )));
        }
        if e.aggregate_type != head.aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "event {idx} is a '{}', batch is '{}'",
                e.aggregate_type, head.aggregate_type
            )));
        }
    }
    Ok(Some((
        (head.company_id, head.aggregate_id),
        head.aggregate_type.as_str(),
    )))
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some((key, aggregate_type)) = batch_stream(&events)? else {
            return Ok(Vec::new());
        };

        let mut streams = self.streams.write().map_err(|_| EventStoreError::Poisoned)?;
        let stream = streams.entry(key).or_default();
        let current = stream.last().map_or(0, |e| e.sequence_number);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, stream is at {current}"
            )));
        }
        if let Some(existing) = stream.first().filter(|e| e.aggregate_type != aggregate_type) {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "stream holds '{}', got '{aggregate_type}'",
                existing.aggregate_type
            )));
        }

        let committed = commit(events, current);
        stream.extend_from_slice(&committed);
        Ok(committed)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams
            .get(&(company_id, aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    fn load_company(&self, company_id: CompanyId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        let mut events: Vec<StoredEvent> = streams
            .iter()
            .filter(|((company, _), _)| *company == company_id)
            .flat_map(|(_, stream)| stream.iter().cloned())
            .collect();
        events.sort_by_key(|e| (e.occurred_at, e.sequence_number));
        Ok(events)
    }
}

#[async_trait::async_trait]
impl EventQuery for InMemoryEventStore {
    async fn query_events(
        &self,
        company_id: CompanyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let matching = self
            .load_company(company_id)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        Ok(EventQueryResult::page(matching, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn order_event(company: CompanyId, order: AggregateId, kind: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            company_id: company,
            aggregate_id: order,
            aggregate_type: "logistics.order".into(),
            event_type: format!("logistics.order.{kind}"),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "kind": kind }),
        }
    }

    #[test]
    fn batches_continue_the_stream_numbering() {
        let store = InMemoryEventStore::new();
        let (c, o) = (CompanyId::new(), AggregateId::new());

        let created = store
            .append(vec![order_event(c, o, "created")], ExpectedVersion::Exact(0))
            .unwrap();
        let later = store
            .append(
                vec![order_event(c, o, "status_changed"), order_event(c, o, "payment_updated")],
                ExpectedVersion::Exact(1),
            )
            .unwrap();

        assert_eq!(created[0].sequence_number, 1);
        let seqs: Vec<u64> = later.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(store.load_stream(c, o).unwrap().len(), 3);
    }

    #[test]
    fn stale_writer_is_rejected_without_side_effects() {
        let store = InMemoryEventStore::new();
        let (c, o) = (CompanyId::new(), AggregateId::new());
        store
            .append(vec![order_event(c, o, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![order_event(c, o, "status_changed")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(c, o).unwrap().len(), 1);
    }

    #[test]
    fn companies_never_see_each_others_streams() {
        let store = InMemoryEventStore::new();
        let (c1, c2, o) = (CompanyId::new(), CompanyId::new(), AggregateId::new());
        store
            .append(vec![order_event(c1, o, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        assert!(store.load_stream(c2, o).unwrap().is_empty());
        assert!(store.load_company(c2).unwrap().is_empty());

        let mixed = vec![order_event(c1, o, "status_changed"), order_event(c2, o, "status_changed")];
        assert!(matches!(
            store.append(mixed, ExpectedVersion::Any),
            Err(EventStoreError::TenantIsolation(_))
        ));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = InMemoryEventStore::new();
        assert!(store.append(Vec::new(), ExpectedVersion::Exact(9)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_log_is_filtered_and_paged() {
        let store = InMemoryEventStore::new();
        let (c, a, b) = (CompanyId::new(), AggregateId::new(), AggregateId::new());
        store
            .append(
                vec![
                    order_event(c, a, "created"),
                    order_event(c, a, "status_changed"),
                    order_event(c, a, "status_changed"),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        store
            .append(vec![order_event(c, b, "created")], ExpectedVersion::Exact(0))
            .unwrap();

        let first_page = store
            .query_events(
                c,
                EventFilter {
                    aggregate_id: Some(a),
                    ..Default::default()
                },
                Pagination::new(Some(2), None),
            )
            .await
            .unwrap();
        assert_eq!(first_page.total, 3);
        assert_eq!(first_page.events.len(), 2);
        assert!(first_page.has_more);

        let status_changes = store
            .query_events(
                c,
                EventFilter {
                    event_type: Some("logistics.order.status_changed".into()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(status_changes.total, 2);
        assert!(!status_changes.has_more);
    }
}
