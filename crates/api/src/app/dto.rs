use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flowgic_core::UserId;
use flowgic_infra::projections::OrderReadModel;
use flowgic_logistics::{
    Financial, MAINTENANCE_DATE_FORMAT, Order, Shipment, Vehicle, VehicleSpec, format_money,
};

// -------------------------
// Request DTOs
// -------------------------

/// `application/x-www-form-urlencoded` body of the status endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
    pub csrfmiddlewaretoken: Option<String>,
}

/// `application/x-www-form-urlencoded` body of the payment endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentForm {
    pub fully_paid: Option<String>,
    pub partial_amount: Option<String>,
    pub csrfmiddlewaretoken: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub cargo_type: String,
    pub cargo_mass_kg: Decimal,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub distance_km: Option<Decimal>,
    #[serde(default)]
    pub agreed_price: Option<Decimal>,
    #[serde(default)]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_at: Option<DateTime<Utc>>,
}

impl From<CreateOrderRequest> for Shipment {
    fn from(body: CreateOrderRequest) -> Self {
        Shipment {
            cargo_type: body.cargo_type,
            cargo_mass_kg: body.cargo_mass_kg,
            origin: body.origin,
            destination: body.destination,
            distance_km: body.distance_km,
            agreed_price: body.agreed_price,
            pickup_at: body.pickup_at,
            delivery_at: body.delivery_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: UserId,
    #[serde(default)]
    pub vehicle_id: Option<String>,
}

/// JSON body of vehicle registration.
#[derive(Debug, Deserialize)]
pub struct RegisterVehicleRequest {
    pub reg_number: String,
    #[serde(default, rename = "type")]
    pub vehicle_type: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub capacity_kg: u32,
}

impl From<RegisterVehicleRequest> for VehicleSpec {
    fn from(body: RegisterVehicleRequest) -> Self {
        VehicleSpec {
            reg_number: body.reg_number,
            vehicle_type: body.vehicle_type,
            model: body.model,
            capacity_kg: body.capacity_kg,
        }
    }
}

/// Form body of the maintenance planner.
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceForm {
    pub date: Option<String>,
    pub note: Option<String>,
    pub csrfmiddlewaretoken: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Only entries of this event type, e.g. `logistics.order.payment_updated`.
    pub event_type: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct FinancialView {
    pub client_cost: String,
    pub fuel_expenses: String,
    pub driver_cost: String,
    pub third_party_cost: String,
    pub profit: String,
    pub payment_status: &'static str,
    pub payment_status_display: &'static str,
    pub partial_amount: Option<String>,
}

impl From<&Financial> for FinancialView {
    fn from(f: &Financial) -> Self {
        Self {
            client_cost: format_money(f.client_cost),
            fuel_expenses: format_money(f.fuel_expenses),
            driver_cost: format_money(f.driver_cost),
            third_party_cost: format_money(f.third_party_cost),
            profit: format_money(f.profit()),
            payment_status: f.payment_status.code(),
            payment_status_display: f.payment_status.label(),
            partial_amount: f.partial_amount.map(format_money),
        }
    }
}

/// Order detail as seen by any role allowed to read it.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub id: String,
    pub status: &'static str,
    pub status_display: &'static str,
    pub status_class: String,
    pub cargo_type: String,
    pub cargo_mass_kg: Decimal,
    pub origin: String,
    pub destination: String,
    pub distance_km: Option<Decimal>,
    pub agreed_price: Option<String>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub delivery_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub driver_id: Option<UserId>,
    pub vehicle_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderDetail {
    fn from(order: &Order) -> Self {
        let shipment = order.shipment();
        let status = order.status();
        Self {
            id: order.id_typed().to_string(),
            status: status.code(),
            status_display: status.label(),
            status_class: status.css_class(),
            cargo_type: shipment.cargo_type.clone(),
            cargo_mass_kg: shipment.cargo_mass_kg,
            origin: shipment.origin.clone(),
            destination: shipment.destination.clone(),
            distance_km: shipment.distance_km,
            agreed_price: shipment.agreed_price.map(format_money),
            pickup_at: shipment.pickup_at,
            delivery_at: shipment.delivery_at,
            created_by: order.created_by(),
            driver_id: order.driver_id(),
            vehicle_id: order.vehicle_id().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// One row of the order list; financial columns only for staff.
#[derive(Debug, Serialize)]
pub struct OrderListItem {
    pub id: String,
    pub status: &'static str,
    pub status_display: &'static str,
    pub cargo_type: String,
    pub origin: String,
    pub destination: String,
    pub driver_id: Option<UserId>,
    pub vehicle_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<String>,
}

impl OrderListItem {
    pub fn from_read_model(row: &OrderReadModel, with_financials: bool) -> Self {
        Self {
            id: row.order_id.to_string(),
            status: row.status.code(),
            status_display: row.status.label(),
            cargo_type: row.cargo_type.clone(),
            origin: row.origin.clone(),
            destination: row.destination.clone(),
            driver_id: row.driver_id,
            vehicle_id: row.vehicle_id.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            payment_status: row
                .payment_status
                .filter(|_| with_financials)
                .map(|s| s.code()),
            profit: row.profit.filter(|_| with_financials).map(format_money),
        }
    }
}

/// Detail body: the order, a fresh CSRF token and, for staff only, the
/// financial block (`null` until a record exists).
#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderDetail,
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<Option<FinancialView>>,
}

#[derive(Debug, Serialize)]
pub struct VehicleView {
    pub id: String,
    pub reg_number: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub model: String,
    pub capacity_kg: u32,
    pub status: &'static str,
    pub status_display: &'static str,
    pub status_class: String,
    pub last_maintenance: Option<String>,
    pub maintenance_note: Option<String>,
}

impl From<&Vehicle> for VehicleView {
    fn from(vehicle: &Vehicle) -> Self {
        let spec = vehicle.spec();
        let status = vehicle.status();
        Self {
            id: vehicle.id_typed().to_string(),
            reg_number: spec.reg_number.clone(),
            vehicle_type: spec.vehicle_type.clone(),
            model: spec.model.clone(),
            capacity_kg: spec.capacity_kg,
            status: status.code(),
            status_display: status.label(),
            status_class: status.css_class(),
            last_maintenance: vehicle
                .last_maintenance()
                .map(|d| d.format(MAINTENANCE_DATE_FORMAT).to_string()),
            maintenance_note: vehicle.maintenance_note().map(str::to_string),
        }
    }
}
