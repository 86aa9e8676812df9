use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use flowgic_core::{AggregateId, CompanyId, UserId};
use flowgic_events::EventEnvelope;
use flowgic_logistics::{AGGREGATE_TYPE, OrderEvent, OrderId, OrderStatus, PaymentStatus};

use crate::read_model::TenantStore;

/// Order list row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReadModel {
    pub order_id: OrderId,
    pub created_by: UserId,
    pub driver_id: Option<UserId>,
    pub vehicle_id: Option<String>,
    pub cargo_type: String,
    pub origin: String,
    pub destination: String,
    pub status: OrderStatus,
    pub agreed_price: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    company_id: CompanyId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum OrderProjectionError {
    #[error("failed to deserialize order event: {0}")]
    Deserialize(String),
    #[error("company isolation violation: {0}")]
    TenantIsolation(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
    #[error("event for unknown order {0}")]
    UnknownOrder(OrderId),
}

/// Builds the order list from `logistics.order` envelopes.
#[derive(Debug)]
pub struct OrdersProjection<S>
where
    S: TenantStore<OrderId, OrderReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> OrdersProjection<S>
where
    S: TenantStore<OrderId, OrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn get_cursor(&self, company_id: CompanyId, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => cursors
                .get(&CursorKey {
                    company_id,
                    aggregate_id,
                })
                .copied()
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, company_id: CompanyId, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(
                CursorKey {
                    company_id,
                    aggregate_id,
                },
                seq,
            );
        }
    }

    /// All orders of a company, newest first.
    pub fn list(&self, company_id: CompanyId) -> Vec<OrderReadModel> {
        let mut rows = self.store.list(company_id);
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.0.as_uuid().cmp(a.order_id.0.as_uuid()))
        });
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), OrderProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let company_id = envelope.company_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(company_id, aggregate_id);
        if seq == 0 {
            return Err(OrderProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Redelivery.
            return Ok(());
        }
        if seq != last + 1 {
            return Err(OrderProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: OrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| OrderProjectionError::Deserialize(e.to_string()))?;

        let (event_company, order_id) = match &ev {
            OrderEvent::OrderCreated(e) => (e.company_id, e.order_id),
            OrderEvent::StatusChanged(e) => (e.company_id, e.order_id),
            OrderEvent::DriverAssigned(e) => (e.company_id, e.order_id),
            OrderEvent::FinancialsUpdated(e) => (e.company_id, e.order_id),
            OrderEvent::PaymentUpdated(e) => (e.company_id, e.order_id),
        };

        if event_company != company_id {
            return Err(OrderProjectionError::TenantIsolation(
                "event company_id does not match envelope company_id".to_string(),
            ));
        }
        if order_id.0 != aggregate_id {
            return Err(OrderProjectionError::TenantIsolation(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let row = match ev {
            OrderEvent::OrderCreated(e) => OrderReadModel {
                order_id: e.order_id,
                created_by: e.created_by,
                driver_id: None,
                vehicle_id: None,
                cargo_type: e.shipment.cargo_type,
                origin: e.shipment.origin,
                destination: e.shipment.destination,
                status: OrderStatus::Created,
                agreed_price: e.shipment.agreed_price,
                payment_status: None,
                profit: None,
                created_at: e.occurred_at,
                updated_at: e.occurred_at,
            },
            other => {
                let mut rm = self
                    .store
                    .get(company_id, &order_id)
                    .ok_or(OrderProjectionError::UnknownOrder(order_id))?;
                match other {
                    OrderEvent::OrderCreated(_) => {}
                    OrderEvent::StatusChanged(e) => {
                        rm.status = e.new_status;
                        rm.updated_at = e.occurred_at;
                    }
                    OrderEvent::DriverAssigned(e) => {
                        rm.driver_id = Some(e.driver_id);
                        rm.vehicle_id = e.vehicle_id;
                        rm.status = e.status;
                        rm.updated_at = e.occurred_at;
                    }
                    OrderEvent::FinancialsUpdated(e) => {
                        if e.agreed_price.is_some() {
                            rm.agreed_price = e.agreed_price;
                        }
                        rm.payment_status = Some(e.financial.payment_status);
                        rm.profit = Some(e.profit);
                        rm.updated_at = e.occurred_at;
                    }
                    OrderEvent::PaymentUpdated(e) => {
                        rm.payment_status = Some(e.financial.payment_status);
                        rm.profit = Some(e.financial.profit());
                        rm.updated_at = e.occurred_at;
                    }
                }
                rm
            }
        };

        self.store.upsert(company_id, order_id, row);
        self.update_cursor(company_id, aggregate_id, seq);
        Ok(())
    }
}
