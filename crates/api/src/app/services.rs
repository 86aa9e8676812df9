use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use flowgic_auth::{CsrfError, CsrfTokens};
use flowgic_core::CompanyId;
use flowgic_events::{EventEnvelope, InMemoryEventBus};
use flowgic_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError, Dispatched},
    event_store::{
        EventFilter, EventQuery, EventQueryResult, EventStore, EventStoreError, InMemoryEventStore,
        Pagination,
    },
    projections::{OrderReadModel, OrdersProjection},
    read_model::InMemoryTenantStore,
    workers::{ProjectionWorker, WorkerHandle},
};
use flowgic_logistics::{
    AGGREGATE_TYPE, FuelPolicy, Order, OrderCommand, OrderId, VEHICLE_AGGREGATE_TYPE, Vehicle,
    VehicleCommand, VehicleId,
};

use crate::config::ApiConfig;
use crate::context::{CompanyContext, PrincipalContext};

type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<Bus>>;
type OrdersReadModel = OrdersProjection<Arc<InMemoryTenantStore<OrderId, OrderReadModel>>>;

/// Process-wide wiring: event store, bus, dispatcher and the order list
/// projection fed by a background worker.
pub struct AppServices {
    dispatcher: Dispatcher,
    event_store: Arc<InMemoryEventStore>,
    orders: Arc<OrdersReadModel>,
    csrf: CsrfTokens,
    fuel_policy: FuelPolicy,
    _projection_worker: WorkerHandle,
}

pub fn build_services(config: &ApiConfig) -> std::io::Result<AppServices> {
    let event_store = Arc::new(InMemoryEventStore::new());
    let event_bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
    let orders = Arc::new(OrdersProjection::new(Arc::new(InMemoryTenantStore::new())));

    let sink = orders.clone();
    let worker = ProjectionWorker::spawn("orders-projection", &event_bus, move |env: EventEnvelope<JsonValue>| {
        sink.apply_envelope(&env)
    })?;

    let dispatcher = CommandDispatcher::new(event_store.clone(), event_bus)
        .with_max_retries(config.dispatch_max_retries);

    let csrf_secret = format!("{}:csrf", config.jwt_secret);

    Ok(AppServices {
        dispatcher,
        event_store,
        orders,
        csrf: CsrfTokens::new(csrf_secret, config.csrf_ttl),
        fuel_policy: config.fuel_policy,
        _projection_worker: worker,
    })
}

impl AppServices {
    pub fn fuel_policy(&self) -> FuelPolicy {
        self.fuel_policy
    }

    /// Run an order command through the dispatcher.
    pub fn execute(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
        command: OrderCommand,
    ) -> Result<Dispatched<Order>, DispatchError> {
        self.dispatcher.execute::<Order>(
            company_id,
            order_id.0,
            AGGREGATE_TYPE,
            command,
            |_company, aggregate_id| Order::empty(OrderId::new(aggregate_id)),
        )
    }

    /// Rehydrate an order from its stream; `NotFound` when it was never created.
    pub fn load_order(&self, company_id: CompanyId, order_id: OrderId) -> Result<Order, DispatchError> {
        let (order, _history) = self.dispatcher.load(company_id, order_id.0, |_company, aggregate_id| {
            Order::empty(OrderId::new(aggregate_id))
        })?;

        if order.is_created() {
            Ok(order)
        } else {
            Err(DispatchError::NotFound)
        }
    }

    pub fn list_orders(&self, company_id: CompanyId) -> Vec<OrderReadModel> {
        self.orders.list(company_id)
    }

    pub fn execute_vehicle(
        &self,
        company_id: CompanyId,
        vehicle_id: VehicleId,
        command: VehicleCommand,
    ) -> Result<Dispatched<Vehicle>, DispatchError> {
        self.dispatcher.execute::<Vehicle>(
            company_id,
            vehicle_id.0,
            VEHICLE_AGGREGATE_TYPE,
            command,
            |_company, aggregate_id| Vehicle::empty(VehicleId::new(aggregate_id)),
        )
    }

    pub fn load_vehicle(&self, company_id: CompanyId, vehicle_id: VehicleId) -> Result<Vehicle, DispatchError> {
        let (vehicle, _history) = self.dispatcher.load(company_id, vehicle_id.0, |_company, aggregate_id| {
            Vehicle::empty(VehicleId::new(aggregate_id))
        })?;

        if vehicle.is_created() {
            Ok(vehicle)
        } else {
            Err(DispatchError::NotFound)
        }
    }

    /// The company's fleet, rehydrated from the event store and ordered by
    /// registration number.
    pub fn list_vehicles(&self, company_id: CompanyId) -> Result<Vec<Vehicle>, DispatchError> {
        let mut ids: Vec<VehicleId> = Vec::new();
        for stored in self.event_store.load_company(company_id)? {
            let id = VehicleId::new(stored.aggregate_id);
            if stored.aggregate_type == VEHICLE_AGGREGATE_TYPE && !ids.contains(&id) {
                ids.push(id);
            }
        }

        let mut vehicles = ids
            .into_iter()
            .map(|id| self.load_vehicle(company_id, id))
            .collect::<Result<Vec<_>, _>>()?;
        vehicles.sort_by(|a, b| a.spec().reg_number.cmp(&b.spec().reg_number));
        Ok(vehicles)
    }

    /// Registration numbers are unique within a company (case-insensitive).
    pub fn reg_number_taken(&self, company_id: CompanyId, reg_number: &str) -> Result<bool, DispatchError> {
        let wanted = reg_number.trim();
        Ok(self
            .list_vehicles(company_id)?
            .iter()
            .any(|v| v.spec().reg_number.eq_ignore_ascii_case(wanted)))
    }

    pub async fn order_events(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
        event_type: Option<String>,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let filter = EventFilter {
            aggregate_id: Some(order_id.0),
            event_type,
        };
        self.event_store.query_events(company_id, filter, pagination).await
    }

    pub fn issue_csrf(&self, company: &CompanyContext, principal: &PrincipalContext) -> Result<String, CsrfError> {
        self.csrf
            .issue(principal.user_id(), company.company_id(), Utc::now())
    }

    pub fn verify_csrf(
        &self,
        token: Option<&str>,
        company: &CompanyContext,
        principal: &PrincipalContext,
    ) -> Result<(), CsrfError> {
        self.csrf
            .verify(token, principal.user_id(), company.company_id(), Utc::now())
    }
}
