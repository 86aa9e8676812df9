//! Logistics orders domain module (event-sourced).
//!
//! Business rules for transport orders (status lifecycle, driver assignment,
//! the per-order financial record) and for the company's vehicle fleet.
//! Deterministic domain logic only: no IO, no HTTP, no storage.

pub mod financial;
pub mod order;
pub mod status;
pub mod vehicle;

pub use financial::{
    Financial, FuelPolicy, PaymentAction, PaymentStatus, format_money, parse_amount,
    parse_payment_amount, profit,
};
pub use order::{
    AGGREGATE_TYPE, AssignDriver, ChangeStatus, CreateOrder, DriverAssigned, FinancialsUpdated,
    Order, OrderCommand, OrderCreated, OrderEvent, OrderId, PaymentUpdated, Shipment,
    StatusChanged, UpdateFinancials, UpdatePayment,
};
pub use status::OrderStatus;
pub use vehicle::{
    ChangeVehicleStatus, MAINTENANCE_DATE_FORMAT, MaintenancePlanned, PlanMaintenance,
    RegisterVehicle, VEHICLE_AGGREGATE_TYPE, Vehicle, VehicleCommand, VehicleEvent, VehicleId,
    VehicleRegistered, VehicleSpec, VehicleStatus, VehicleStatusChanged, parse_maintenance_date,
};
