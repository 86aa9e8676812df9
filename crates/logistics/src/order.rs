use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flowgic_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, UserId};
use flowgic_events::Event;

use crate::financial::{Financial, FuelPolicy, PaymentAction, max_amount};
use crate::status::OrderStatus;

/// Stream type tag for order event streams.
pub const AGGREGATE_TYPE: &str = "logistics.order";

/// Order identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What is being moved, from where to where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub cargo_type: String,
    pub cargo_mass_kg: Decimal,
    pub origin: String,
    pub destination: String,
    pub distance_km: Option<Decimal>,
    pub agreed_price: Option<Decimal>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub delivery_at: Option<DateTime<Utc>>,
}

impl Shipment {
    fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("cargo_type", &self.cargo_type),
            ("origin", &self.origin),
            ("destination", &self.destination),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field} is required")));
            }
        }

        for (field, value) in [
            ("cargo_mass_kg", Some(self.cargo_mass_kg)),
            ("distance_km", self.distance_km),
            ("agreed_price", self.agreed_price),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(DomainError::validation(format!("{field} must not be negative")));
            }
            if value.is_some_and(|v| v > max_amount()) {
                return Err(DomainError::validation(format!("Invalid value for {field}")));
            }
        }

        if let (Some(pickup), Some(delivery)) = (self.pickup_at, self.delivery_at) {
            if delivery < pickup {
                return Err(DomainError::validation(
                    "delivery_at must not be before pickup_at",
                ));
            }
        }

        Ok(())
    }
}

/// Aggregate root: a transport order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    company_id: Option<CompanyId>,
    created_by: Option<UserId>,
    shipment: Shipment,
    status: OrderStatus,
    driver_id: Option<UserId>,
    vehicle_id: Option<String>,
    financial: Option<Financial>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            company_id: None,
            created_by: None,
            shipment: Shipment::default(),
            status: OrderStatus::Created,
            driver_id: None,
            vehicle_id: None,
            financial: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn driver_id(&self) -> Option<UserId> {
        self.driver_id
    }

    pub fn vehicle_id(&self) -> Option<&str> {
        self.vehicle_id.as_deref()
    }

    pub fn financial(&self) -> Option<&Financial> {
        self.financial.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// The record a financial or payment update starts from: the existing
    /// one, or a fresh one priced from the order.
    fn financial_or_open(&self, fuel_policy: &FuelPolicy) -> Result<Financial, DomainError> {
        match &self.financial {
            Some(existing) => Ok(existing.clone()),
            None => Ok(Financial::open(
                self.shipment.agreed_price.unwrap_or(Decimal::ZERO),
                fuel_policy.estimate(self.shipment.distance_km)?,
            )),
        }
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub created_by: UserId,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus. `status` is the raw code as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub status: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignDriver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDriver {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub driver_id: UserId,
    pub vehicle_id: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateFinancials. `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFinancials {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub agreed_price: Option<Decimal>,
    pub fuel_expenses: Option<Decimal>,
    pub driver_cost: Option<Decimal>,
    pub third_party_cost: Option<Decimal>,
    pub fuel_policy: FuelPolicy,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateFinancials {
    fn is_empty(&self) -> bool {
        self.agreed_price.is_none()
            && self.fuel_expenses.is_none()
            && self.driver_cost.is_none()
            && self.third_party_cost.is_none()
    }
}

/// Command: UpdatePayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayment {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub action: PaymentAction,
    pub fuel_policy: FuelPolicy,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    ChangeStatus(ChangeStatus),
    AssignDriver(AssignDriver),
    UpdateFinancials(UpdateFinancials),
    UpdatePayment(UpdatePayment),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub created_by: UserId,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DriverAssigned. `status` is the order status after assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverAssigned {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub driver_id: UserId,
    pub vehicle_id: Option<String>,
    pub status: OrderStatus,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FinancialsUpdated. Carries the full record after the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialsUpdated {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    /// Set when the update repriced the order.
    pub agreed_price: Option<Decimal>,
    pub financial: Financial,
    pub profit: Decimal,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentUpdated. Carries the full record after the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdated {
    pub company_id: CompanyId,
    pub order_id: OrderId,
    pub action: PaymentAction,
    pub financial: Financial,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    StatusChanged(StatusChanged),
    DriverAssigned(DriverAssigned),
    FinancialsUpdated(FinancialsUpdated),
    PaymentUpdated(PaymentUpdated),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "logistics.order.created",
            OrderEvent::StatusChanged(_) => "logistics.order.status_changed",
            OrderEvent::DriverAssigned(_) => "logistics.order.assigned",
            OrderEvent::FinancialsUpdated(_) => "logistics.order.financials_updated",
            OrderEvent::PaymentUpdated(_) => "logistics.order.payment_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::DriverAssigned(e) => e.occurred_at,
            OrderEvent::FinancialsUpdated(e) => e.occurred_at,
            OrderEvent::PaymentUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.company_id = Some(e.company_id);
                self.created_by = Some(e.created_by);
                self.shipment = e.shipment.clone();
                self.status = OrderStatus::Created;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.new_status;
            }
            OrderEvent::DriverAssigned(e) => {
                self.driver_id = Some(e.driver_id);
                self.vehicle_id = e.vehicle_id.clone();
                self.status = e.status;
            }
            OrderEvent::FinancialsUpdated(e) => {
                if let Some(price) = e.agreed_price {
                    self.shipment.agreed_price = Some(price);
                }
                self.financial = Some(e.financial.clone());
            }
            OrderEvent::PaymentUpdated(e) => {
                self.financial = Some(e.financial.clone());
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            OrderCommand::AssignDriver(cmd) => self.handle_assign(cmd),
            OrderCommand::UpdateFinancials(cmd) => self.handle_update_financials(cmd),
            OrderCommand::UpdatePayment(cmd) => self.handle_update_payment(cmd),
        }
    }
}

impl Order {
    fn ensure_existing(&self, company_id: CompanyId, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        cmd.shipment.validate()?;

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            created_by: cmd.created_by,
            shipment: cmd.shipment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        let new_status: OrderStatus = cmd.status.parse()?;
        if new_status == self.status {
            return Err(DomainError::validation("Status unchanged"));
        }

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            old_status: self.status,
            new_status,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignDriver) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        let vehicle_id = cmd
            .vehicle_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        if self.driver_id == Some(cmd.driver_id) && self.vehicle_id == vehicle_id {
            return Ok(vec![]);
        }

        // A fresh order moves to `assigned`; later stages keep their status.
        let status = match self.status {
            OrderStatus::Created => OrderStatus::Assigned,
            other => other,
        };

        Ok(vec![OrderEvent::DriverAssigned(DriverAssigned {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            driver_id: cmd.driver_id,
            vehicle_id,
            status,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_financials(
        &self,
        cmd: &UpdateFinancials,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if cmd.is_empty() {
            return Err(DomainError::validation("No financial data provided"));
        }

        let mut next = self.financial_or_open(&cmd.fuel_policy)?;
        if let Some(v) = cmd.agreed_price {
            next.client_cost = v;
        }
        if let Some(v) = cmd.fuel_expenses {
            next.fuel_expenses = v;
        }
        if let Some(v) = cmd.driver_cost {
            next.driver_cost = v;
        }
        if let Some(v) = cmd.third_party_cost {
            next.third_party_cost = v;
        }

        let repriced = cmd
            .agreed_price
            .filter(|p| self.shipment.agreed_price != Some(*p));

        if self.financial.as_ref() == Some(&next) && repriced.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::FinancialsUpdated(FinancialsUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            agreed_price: repriced,
            profit: next.profit(),
            financial: next,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_payment(&self, cmd: &UpdatePayment) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        let next = cmd.action.applied_to(&self.financial_or_open(&cmd.fuel_policy)?);
        if self.financial.as_ref() == Some(&next) {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::PaymentUpdated(PaymentUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            action: cmd.action.clone(),
            financial: next,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financial::PaymentStatus;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn shipment() -> Shipment {
        Shipment {
            cargo_type: "Pallets".into(),
            cargo_mass_kg: dec("1200"),
            origin: "Moscow".into(),
            destination: "Tver".into(),
            distance_km: Some(dec("200")),
            agreed_price: Some(dec("500")),
            pickup_at: None,
            delivery_at: None,
        }
    }

    struct Fixture {
        order: Order,
        company_id: CompanyId,
        order_id: OrderId,
        actor: UserId,
    }

    impl Fixture {
        fn created() -> Self {
            let company_id = CompanyId::new();
            let order_id = OrderId::new(AggregateId::new());
            let actor = UserId::new();
            let mut order = Order::empty(order_id);

            let events = order
                .handle(&OrderCommand::CreateOrder(CreateOrder {
                    company_id,
                    order_id,
                    created_by: actor,
                    shipment: shipment(),
                    occurred_at: test_time(),
                }))
                .unwrap();
            order.apply(&events[0]);

            Self {
                order,
                company_id,
                order_id,
                actor,
            }
        }

        fn run(&mut self, cmd: OrderCommand) -> Result<Vec<OrderEvent>, DomainError> {
            let events = self.order.handle(&cmd)?;
            for e in &events {
                self.order.apply(e);
            }
            Ok(events)
        }

        fn change_status(&self, status: &str) -> OrderCommand {
            OrderCommand::ChangeStatus(ChangeStatus {
                company_id: self.company_id,
                order_id: self.order_id,
                status: status.into(),
                actor: self.actor,
                occurred_at: test_time(),
            })
        }

        fn financials(
            &self,
            fuel: Option<&str>,
            driver: Option<&str>,
            third_party: Option<&str>,
        ) -> OrderCommand {
            OrderCommand::UpdateFinancials(UpdateFinancials {
                company_id: self.company_id,
                order_id: self.order_id,
                agreed_price: None,
                fuel_expenses: fuel.map(dec),
                driver_cost: driver.map(dec),
                third_party_cost: third_party.map(dec),
                fuel_policy: FuelPolicy::default(),
                actor: self.actor,
                occurred_at: test_time(),
            })
        }

        fn payment(&self, action: PaymentAction) -> OrderCommand {
            OrderCommand::UpdatePayment(UpdatePayment {
                company_id: self.company_id,
                order_id: self.order_id,
                action,
                fuel_policy: FuelPolicy::default(),
                actor: self.actor,
                occurred_at: test_time(),
            })
        }
    }

    #[test]
    fn create_order_emits_order_created_event() {
        let f = Fixture::created();
        assert!(f.order.is_created());
        assert_eq!(f.order.status(), OrderStatus::Created);
        assert_eq!(f.order.company_id(), Some(f.company_id));
        assert_eq!(f.order.version(), 1);
        assert!(f.order.financial().is_none());
    }

    #[test]
    fn create_rejects_incomplete_shipment() {
        let order = Order::empty(OrderId::new(AggregateId::new()));
        let mut s = shipment();
        s.origin = "  ".into();

        let err = order
            .handle(&OrderCommand::CreateOrder(CreateOrder {
                company_id: CompanyId::new(),
                order_id: *order.id(),
                created_by: UserId::new(),
                shipment: s,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("origin is required"));
    }

    #[test]
    fn create_rejects_out_of_range_figures() {
        let too_heavy = Shipment {
            cargo_mass_kg: dec("1000000000001"),
            ..shipment()
        };
        let too_far = Shipment {
            distance_km: Some(dec("4000000000000000000000000000")),
            ..shipment()
        };
        let too_pricey = Shipment {
            agreed_price: Some(dec("100000000000000000000")),
            ..shipment()
        };

        for (field, s) in [
            ("cargo_mass_kg", too_heavy),
            ("distance_km", too_far),
            ("agreed_price", too_pricey),
        ] {
            let order = Order::empty(OrderId::new(AggregateId::new()));

            let err = order
                .handle(&OrderCommand::CreateOrder(CreateOrder {
                    company_id: CompanyId::new(),
                    order_id: *order.id(),
                    created_by: UserId::new(),
                    shipment: s,
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert_eq!(err, DomainError::validation(format!("Invalid value for {field}")));
        }
    }

    #[test]
    fn opening_a_record_with_an_overflowing_fuel_policy_is_a_validation_error() {
        let mut f = Fixture::created();
        let cmd = OrderCommand::UpdateFinancials(UpdateFinancials {
            company_id: f.company_id,
            order_id: f.order_id,
            agreed_price: None,
            fuel_expenses: None,
            driver_cost: Some(dec("10")),
            third_party_cost: None,
            fuel_policy: FuelPolicy {
                consumption_l_per_100km: Decimal::MAX,
                price_per_liter: Decimal::MAX,
            },
            actor: f.actor,
            occurred_at: test_time(),
        });

        assert_eq!(
            f.run(cmd).unwrap_err(),
            DomainError::validation("Fuel estimate out of range")
        );
        assert!(f.order.financial().is_none());
        assert_eq!(f.order.version(), 1);
    }

    #[test]
    fn status_change_records_old_and_new_status() {
        let mut f = Fixture::created();
        let events = f.run(f.change_status("completed")).unwrap();

        match &events[0] {
            OrderEvent::StatusChanged(e) => {
                assert_eq!(e.old_status, OrderStatus::Created);
                assert_eq!(e.new_status, OrderStatus::Completed);
                assert_eq!(e.actor, f.actor);
            }
            other => panic!("expected StatusChanged, got {other:?}"),
        }
        assert_eq!(f.order.status(), OrderStatus::Completed);
        assert!(f.order.financial().is_none());
    }

    #[test]
    fn status_change_rejects_empty_unknown_and_unchanged() {
        let mut f = Fixture::created();

        assert_eq!(
            f.run(f.change_status("")).unwrap_err(),
            DomainError::validation("Status is required")
        );
        assert_eq!(
            f.run(f.change_status("flying")).unwrap_err(),
            DomainError::validation("Invalid status")
        );
        assert_eq!(
            f.run(f.change_status("created")).unwrap_err(),
            DomainError::validation("Status unchanged")
        );
        assert_eq!(f.order.version(), 1);
    }

    #[test]
    fn commands_against_missing_order_are_not_found() {
        let f = Fixture::created();
        let missing = Order::empty(f.order_id);
        assert_eq!(
            missing.handle(&f.change_status("loading")).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn first_financial_update_opens_record_from_agreed_price() {
        let mut f = Fixture::created();
        let events = f.run(f.financials(Some("100"), Some("50"), None)).unwrap();

        match &events[0] {
            OrderEvent::FinancialsUpdated(e) => assert_eq!(e.profit, dec("350")),
            other => panic!("expected FinancialsUpdated, got {other:?}"),
        }

        let fin = f.order.financial().unwrap();
        assert_eq!(fin.client_cost, dec("500"));
        assert_eq!(fin.fuel_expenses, dec("100"));
        assert_eq!(fin.driver_cost, dec("50"));
        assert_eq!(fin.payment_status, PaymentStatus::Unpaid);
        assert_eq!(f.order.status(), OrderStatus::Created);
    }

    #[test]
    fn opening_without_fuel_figure_estimates_it_from_distance() {
        let mut f = Fixture::created();
        f.run(f.financials(None, Some("50"), None)).unwrap();

        // 200 km: 2 * 30 L * 82 = 4920
        assert_eq!(f.order.financial().unwrap().fuel_expenses, dec("4920"));
    }

    #[test]
    fn omitted_fields_keep_previous_values() {
        let mut f = Fixture::created();
        f.run(f.financials(Some("100"), Some("50"), None)).unwrap();
        f.run(f.financials(None, None, Some("30"))).unwrap();

        let fin = f.order.financial().unwrap();
        assert_eq!(fin.fuel_expenses, dec("100"));
        assert_eq!(fin.driver_cost, dec("50"));
        assert_eq!(fin.profit(), dec("320"));
    }

    #[test]
    fn empty_or_identical_financial_updates() {
        let mut f = Fixture::created();

        assert_eq!(
            f.run(f.financials(None, None, None)).unwrap_err(),
            DomainError::validation("No financial data provided")
        );

        f.run(f.financials(Some("100"), Some("50"), None)).unwrap();
        let version = f.order.version();
        assert!(f.run(f.financials(Some("100"), Some("50"), None)).unwrap().is_empty());
        assert_eq!(f.order.version(), version);
    }

    #[test]
    fn repricing_updates_client_cost_and_order_price() {
        let mut f = Fixture::created();
        let mut cmd = f.financials(Some("0"), None, None);
        if let OrderCommand::UpdateFinancials(c) = &mut cmd {
            c.agreed_price = Some(dec("800"));
        }
        f.run(cmd).unwrap();

        assert_eq!(f.order.shipment().agreed_price, Some(dec("800")));
        assert_eq!(f.order.financial().unwrap().profit(), dec("800"));
    }

    #[test]
    fn payment_updates_are_recorded_only_when_something_changes() {
        let mut f = Fixture::created();

        let events = f.run(f.payment(PaymentAction::MarkedAsPaid)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            f.order.financial().unwrap().payment_status,
            PaymentStatus::Paid
        );

        assert!(f.run(f.payment(PaymentAction::MarkedAsPaid)).unwrap().is_empty());

        let events = f
            .run(f.payment(PaymentAction::PartialPayment { amount: dec("200") }))
            .unwrap();
        assert_eq!(events.len(), 1);
        let fin = f.order.financial().unwrap();
        assert_eq!(fin.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(fin.partial_amount, Some(dec("200")));
    }

    #[test]
    fn assigning_a_driver_moves_fresh_orders_to_assigned() {
        let mut f = Fixture::created();
        let driver = UserId::new();
        let assign = OrderCommand::AssignDriver(AssignDriver {
            company_id: f.company_id,
            order_id: f.order_id,
            driver_id: driver,
            vehicle_id: Some(" A123BC ".into()),
            actor: f.actor,
            occurred_at: test_time(),
        });

        f.run(assign.clone()).unwrap();
        assert_eq!(f.order.driver_id(), Some(driver));
        assert_eq!(f.order.vehicle_id(), Some("A123BC"));
        assert_eq!(f.order.status(), OrderStatus::Assigned);

        assert!(f.run(assign).unwrap().is_empty());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let f = Fixture::created();
        let before = f.order.clone();

        let cmd = f.change_status("loading");
        let a = f.order.handle(&cmd).unwrap();
        let b = f.order.handle(&cmd).unwrap();

        assert_eq!(f.order, before);
        assert_eq!(a, b);
    }

    #[test]
    fn events_roundtrip_through_json_for_rehydration() {
        let mut f = Fixture::created();
        let mut history = Vec::new();
        history.extend(f.run(f.change_status("loading")).unwrap());
        history.extend(f.run(f.financials(Some("10"), Some("5"), None)).unwrap());

        let mut replayed = f.order.clone();
        replayed.version = 1;
        replayed.status = OrderStatus::Created;
        replayed.financial = None;
        for e in &history {
            let json = serde_json::to_value(e).unwrap();
            replayed.apply(&serde_json::from_value(json).unwrap());
        }

        assert_eq!(replayed.status(), f.order.status());
        assert_eq!(replayed.financial(), f.order.financial());
        assert_eq!(replayed.version(), f.order.version());
    }
}
