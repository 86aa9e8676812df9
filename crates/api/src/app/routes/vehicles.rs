//! `/vehicles/...` handlers: the company fleet.
//!
//! Mutations follow the same check order as the order endpoints:
//! permission, body, CSRF token, vehicle existence, then field validation.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        Extension, Path,
        rejection::{FormRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use flowgic_auth::Permission;
use flowgic_core::AggregateId;
use flowgic_infra::command_dispatcher::{DispatchError, Dispatched};
use flowgic_logistics::{
    ChangeVehicleStatus, MAINTENANCE_DATE_FORMAT, PlanMaintenance, RegisterVehicle, Vehicle,
    VehicleCommand, VehicleId,
};

use crate::app::routes::{guard, orders::check_csrf};
use crate::app::{dto, errors, services::AppServices};
use crate::context::{CompanyContext, PrincipalContext};

pub const DUPLICATE_REG_NUMBER: &str = "Vehicle with this registration number already exists";

type Handled = Result<Response, Response>;

pub async fn list_vehicles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Handled {
    guard(&company, &principal, &Permission::VEHICLES_READ)?;

    let items: Vec<dto::VehicleView> = services
        .list_vehicles(company.company_id())
        .map_err(vehicle_error)?
        .iter()
        .map(dto::VehicleView::from)
        .collect();

    Ok(Json(json!({ "items": items })).into_response())
}

pub async fn register_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    headers: HeaderMap,
    body: Result<Json<dto::RegisterVehicleRequest>, JsonRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::VEHICLES_MANAGE)?;
    let Json(body) = body.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, None)?;

    if services
        .reg_number_taken(company.company_id(), &body.reg_number)
        .map_err(vehicle_error)?
    {
        return Err(errors::bad_request(DUPLICATE_REG_NUMBER));
    }

    let vehicle_id = VehicleId::new(AggregateId::new());
    let cmd = VehicleCommand::RegisterVehicle(RegisterVehicle {
        company_id: company.company_id(),
        vehicle_id,
        spec: body.into(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    run(&services, &company, &principal, vehicle_id, cmd, "register")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": vehicle_id.to_string() })),
    )
        .into_response())
}

pub async fn get_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Handled {
    guard(&company, &principal, &Permission::VEHICLES_READ)?;
    let vehicle_id = parse_vehicle_id(&id)?;

    let vehicle = services
        .load_vehicle(company.company_id(), vehicle_id)
        .map_err(vehicle_error)?;

    Ok(Json(dto::VehicleView::from(&vehicle)).into_response())
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Result<Form<dto::StatusForm>, FormRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::VEHICLES_MANAGE)?;
    let Form(form) = form.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, form.csrfmiddlewaretoken.as_deref())?;
    let vehicle_id = existing_vehicle(&services, &company, &id)?;

    let cmd = VehicleCommand::ChangeVehicleStatus(ChangeVehicleStatus {
        company_id: company.company_id(),
        vehicle_id,
        status: form.status.unwrap_or_default(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, vehicle_id, cmd, "status")?;
    let status = aggregate.status();

    Ok(Json(json!({
        "success": true,
        "status": status.code(),
        "status_display": status.label(),
    }))
    .into_response())
}

pub async fn plan_maintenance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Result<Form<dto::MaintenanceForm>, FormRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::VEHICLES_MANAGE)?;
    let Form(form) = form.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, form.csrfmiddlewaretoken.as_deref())?;
    let vehicle_id = existing_vehicle(&services, &company, &id)?;

    let cmd = VehicleCommand::PlanMaintenance(PlanMaintenance {
        company_id: company.company_id(),
        vehicle_id,
        date: form.date.unwrap_or_default(),
        note: form.note.unwrap_or_default(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, vehicle_id, cmd, "maintenance")?;
    let last_maintenance = aggregate
        .last_maintenance()
        .map(|d| d.format(MAINTENANCE_DATE_FORMAT).to_string());

    Ok(Json(json!({
        "success": true,
        "last_maintenance": last_maintenance,
        "note": aggregate.maintenance_note().unwrap_or_default(),
    }))
    .into_response())
}

fn parse_vehicle_id(raw: &str) -> Result<VehicleId, Response> {
    raw.parse::<AggregateId>()
        .map(VehicleId::new)
        .map_err(|_| errors::vehicle_not_found())
}

fn existing_vehicle(services: &AppServices, company: &CompanyContext, raw: &str) -> Result<VehicleId, Response> {
    let vehicle_id = parse_vehicle_id(raw)?;
    services
        .load_vehicle(company.company_id(), vehicle_id)
        .map_err(vehicle_error)?;
    Ok(vehicle_id)
}

fn vehicle_error(err: DispatchError) -> Response {
    match err {
        DispatchError::NotFound => errors::vehicle_not_found(),
        other => errors::dispatch_error_to_response(other),
    }
}

fn run(
    services: &AppServices,
    company: &CompanyContext,
    principal: &PrincipalContext,
    vehicle_id: VehicleId,
    command: VehicleCommand,
    mutation: &'static str,
) -> Result<Dispatched<Vehicle>, Response> {
    services
        .execute_vehicle(company.company_id(), vehicle_id, command)
        .inspect(|dispatched| {
            tracing::info!(
                vehicle_id = %vehicle_id,
                company_id = %company.company_id(),
                user_id = %principal.user_id(),
                mutation,
                events = dispatched.committed.len(),
                "vehicle mutation accepted"
            );
        })
        .map_err(|err| {
            tracing::info!(
                vehicle_id = %vehicle_id,
                company_id = %company.company_id(),
                user_id = %principal.user_id(),
                mutation,
                error = %err,
                "vehicle mutation rejected"
            );
            vehicle_error(err)
        })
}
