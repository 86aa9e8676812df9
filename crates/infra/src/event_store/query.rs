//! Paginated reads over a company's events, backing the order audit log.

use flowgic_core::{AggregateId, CompanyId};
use serde::{Deserialize, Serialize};

use crate::event_store::{EventStoreError, StoredEvent};

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Pagination {
    /// `limit` is clamped into `1..=1000`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<AggregateId>,
    /// e.g. `"logistics.order.financials_updated"`
    pub event_type: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &StoredEvent) -> bool {
        self.aggregate_id.is_none_or(|id| event.aggregate_id == id)
            && self
                .event_type
                .as_deref()
                .is_none_or(|t| event.event_type == t)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    pub events: Vec<StoredEvent>,
    /// Count before pagination.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl EventQueryResult {
    pub(crate) fn page(matching: Vec<StoredEvent>, pagination: Pagination) -> Self {
        let total = matching.len() as u64;
        let events: Vec<StoredEvent> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = u64::from(pagination.offset) + (events.len() as u64) < total;
        Self {
            events,
            total,
            pagination,
            has_more,
        }
    }
}

#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Ascending by `(occurred_at, sequence_number)`.
    async fn query_events(
        &self,
        company_id: CompanyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(Pagination::new(Some(0), None).limit, 1);
        assert_eq!(Pagination::new(Some(5000), Some(7)), Pagination { limit: 1000, offset: 7 });
        assert_eq!(Pagination::default(), Pagination { limit: 50, offset: 0 });
    }
}
