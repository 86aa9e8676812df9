//! `/requests/...` handlers.
//!
//! Every mutation is checked in the same order: permission (403), request
//! body, CSRF token (403), order existence (404), then field validation
//! (400). Successful responses are built from the rehydrated aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        Extension, Multipart, Path, Query,
        multipart::MultipartRejection,
        rejection::{FormRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use flowgic_auth::{Permission, Role};
use flowgic_core::{AggregateId, UserId};
use flowgic_infra::command_dispatcher::Dispatched;
use flowgic_infra::event_store::Pagination;
use flowgic_logistics::{
    AssignDriver, ChangeStatus, CreateOrder, Order, OrderCommand, OrderId, PaymentAction,
    UpdateFinancials, UpdatePayment, format_money, parse_amount,
};

use crate::app::routes::guard;
use crate::app::{dto, errors, services::AppServices};
use crate::context::{CompanyContext, PrincipalContext};

/// Header carrying the anti-forgery token (matched case-insensitively).
pub const CSRF_HEADER: &str = "x-csrftoken";

type Handled = Result<Response, Response>;

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_READ)?;

    let staff = principal.is_staff();
    let items: Vec<dto::OrderListItem> = services
        .list_orders(company.company_id())
        .iter()
        .filter(|row| can_see(&principal, Some(row.created_by), row.driver_id))
        .map(|row| dto::OrderListItem::from_read_model(row, staff))
        .collect();

    Ok(Json(json!({ "items": items })).into_response())
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    headers: HeaderMap,
    body: Result<Json<dto::CreateOrderRequest>, JsonRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_CREATE)?;
    let Json(body) = body.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, None)?;

    let order_id = OrderId::new(AggregateId::new());
    let cmd = OrderCommand::CreateOrder(CreateOrder {
        company_id: company.company_id(),
        order_id,
        created_by: principal.user_id(),
        shipment: body.into(),
        occurred_at: Utc::now(),
    });

    run(&services, &company, &principal, order_id, cmd, "create")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": order_id.to_string() })),
    )
        .into_response())
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_READ)?;
    let order_id = parse_order_id(&id)?;

    let order = services
        .load_order(company.company_id(), order_id)
        .map_err(errors::dispatch_error_to_response)?;
    if !can_see(&principal, order.created_by(), order.driver_id()) {
        return Err(errors::not_found());
    }

    let csrf_token = services.issue_csrf(&company, &principal).map_err(|e| {
        tracing::error!(error = %e, "failed to issue csrf token");
        errors::json_failure(StatusCode::INTERNAL_SERVER_ERROR, errors::INTERNAL)
    })?;

    let financial = principal
        .is_staff()
        .then(|| order.financial().map(dto::FinancialView::from));

    Ok(Json(dto::OrderDetailResponse {
        order: dto::OrderDetail::from(&order),
        csrf_token,
        financial,
    })
    .into_response())
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Result<Form<dto::StatusForm>, FormRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_STATUS_UPDATE)?;
    let Form(form) = form.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, form.csrfmiddlewaretoken.as_deref())?;
    let order_id = existing_order(&services, &company, &id)?;

    let cmd = OrderCommand::ChangeStatus(ChangeStatus {
        company_id: company.company_id(),
        order_id,
        status: form.status.unwrap_or_default(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, order_id, cmd, "status")?;
    let status = aggregate.status();

    Ok(Json(json!({
        "success": true,
        "status": status.code(),
        "status_display": status.label(),
    }))
    .into_response())
}

pub async fn update_financials(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_FINANCIALS_UPDATE)?;
    let multipart = multipart.map_err(|e| errors::bad_request(e.body_text()))?;
    let fields = read_multipart(multipart).await?;
    check_csrf(
        &services,
        &company,
        &principal,
        &headers,
        fields.get("csrfmiddlewaretoken").map(String::as_str),
    )?;
    let order_id = existing_order(&services, &company, &id)?;

    let cmd = OrderCommand::UpdateFinancials(UpdateFinancials {
        company_id: company.company_id(),
        order_id,
        agreed_price: amount_field(&fields, "agreed_price")?,
        fuel_expenses: amount_field(&fields, "fuel_expenses")?,
        driver_cost: amount_field(&fields, "driver_cost")?,
        third_party_cost: amount_field(&fields, "third_party_cost")?,
        fuel_policy: services.fuel_policy(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, order_id, cmd, "financials")?;
    let profit = aggregate.financial().map(|f| f.profit()).ok_or_else(|| {
        tracing::error!(order_id = %order_id, "financial record missing after update");
        errors::json_failure(StatusCode::INTERNAL_SERVER_ERROR, errors::INTERNAL)
    })?;

    Ok(Json(json!({
        "success": true,
        "profit": format_money(profit),
    }))
    .into_response())
}

pub async fn update_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Result<Form<dto::PaymentForm>, FormRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_PAYMENT_UPDATE)?;
    let Form(form) = form.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, form.csrfmiddlewaretoken.as_deref())?;
    let order_id = existing_order(&services, &company, &id)?;

    let action = PaymentAction::from_form(form.fully_paid.as_deref(), form.partial_amount.as_deref())
        .map_err(|e| errors::bad_request(e.message()))?;

    let cmd = OrderCommand::UpdatePayment(UpdatePayment {
        company_id: company.company_id(),
        order_id,
        action,
        fuel_policy: services.fuel_policy(),
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, order_id, cmd, "payment")?;
    let status = aggregate.financial().map(|f| f.payment_status).ok_or_else(|| {
        tracing::error!(order_id = %order_id, "financial record missing after payment");
        errors::json_failure(StatusCode::INTERNAL_SERVER_ERROR, errors::INTERNAL)
    })?;

    Ok(Json(json!({
        "success": true,
        "payment_status": status.code(),
        "payment_status_display": status.label(),
    }))
    .into_response())
}

pub async fn assign_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<dto::AssignDriverRequest>, JsonRejection>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_ASSIGN)?;
    let Json(body) = body.map_err(|e| errors::bad_request(e.body_text()))?;
    check_csrf(&services, &company, &principal, &headers, None)?;
    let order_id = existing_order(&services, &company, &id)?;

    let cmd = OrderCommand::AssignDriver(AssignDriver {
        company_id: company.company_id(),
        order_id,
        driver_id: body.driver_id,
        vehicle_id: body.vehicle_id,
        actor: principal.user_id(),
        occurred_at: Utc::now(),
    });

    let Dispatched { aggregate, .. } = run(&services, &company, &principal, order_id, cmd, "assign")?;
    let status = aggregate.status();

    Ok(Json(json!({
        "success": true,
        "driver_id": aggregate.driver_id(),
        "vehicle_id": aggregate.vehicle_id(),
        "status": status.code(),
        "status_display": status.label(),
    }))
    .into_response())
}

/// The order's audit log, oldest first.
pub async fn list_order_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::EventsQuery>,
) -> Handled {
    guard(&company, &principal, &Permission::ORDERS_EVENTS_READ)?;
    let order_id = existing_order(&services, &company, &id)?;

    let page = services
        .order_events(
            company.company_id(),
            order_id,
            query.event_type.filter(|t| !t.trim().is_empty()),
            Pagination::new(query.limit, query.offset),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, order_id = %order_id, "audit log query failed");
            errors::json_failure(StatusCode::INTERNAL_SERVER_ERROR, errors::INTERNAL)
        })?;

    Ok(Json(json!({
        "items": page.events,
        "total": page.total,
        "has_more": page.has_more,
    }))
    .into_response())
}

// -------------------------
// Helpers
// -------------------------

fn parse_order_id(raw: &str) -> Result<OrderId, Response> {
    raw.parse::<AggregateId>()
        .map(OrderId::new)
        .map_err(|_| errors::not_found())
}

/// Parse the path id and make sure the order exists in the caller's company.
fn existing_order(services: &AppServices, company: &CompanyContext, raw: &str) -> Result<OrderId, Response> {
    let order_id = parse_order_id(raw)?;
    services
        .load_order(company.company_id(), order_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(order_id)
}

/// Staff see every order; drivers their assignments; customers their own
/// requests.
fn can_see(principal: &PrincipalContext, created_by: Option<UserId>, driver_id: Option<UserId>) -> bool {
    if principal.is_staff() {
        return true;
    }
    let me = Some(principal.user_id());
    (principal.has_role(&Role::DRIVER) && driver_id == me)
        || (principal.has_role(&Role::CUSTOMER) && created_by == me)
}

pub(crate) fn check_csrf(
    services: &AppServices,
    company: &CompanyContext,
    principal: &PrincipalContext,
    headers: &HeaderMap,
    form_field: Option<&str>,
) -> Result<(), Response> {
    let token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(form_field);

    services.verify_csrf(token, company, principal).map_err(|e| {
        tracing::info!(user_id = %principal.user_id(), error = %e, "csrf verification failed");
        errors::json_failure(StatusCode::FORBIDDEN, errors::CSRF_FAILED)
    })
}

async fn read_multipart(mut multipart: Multipart) -> Result<HashMap<String, String>, Response> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| errors::bad_request(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| errors::bad_request(e.body_text()))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

/// Blank and absent fields both mean "keep the current value".
fn amount_field(fields: &HashMap<String, String>, name: &str) -> Result<Option<Decimal>, Response> {
    match fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => parse_amount(name, raw)
            .map(Some)
            .map_err(|e| errors::bad_request(e.message())),
        None => Ok(None),
    }
}

fn run(
    services: &AppServices,
    company: &CompanyContext,
    principal: &PrincipalContext,
    order_id: OrderId,
    command: OrderCommand,
    mutation: &'static str,
) -> Result<Dispatched<Order>, Response> {
    match services.execute(company.company_id(), order_id, command) {
        Ok(dispatched) => {
            tracing::info!(
                order_id = %order_id,
                company_id = %company.company_id(),
                user_id = %principal.user_id(),
                mutation,
                events = dispatched.committed.len(),
                "order mutation accepted"
            );
            Ok(dispatched)
        }
        Err(err) => {
            tracing::info!(
                order_id = %order_id,
                company_id = %company.company_id(),
                user_id = %principal.user_id(),
                mutation,
                error = %err,
                "order mutation rejected"
            );
            Err(errors::dispatch_error_to_response(err))
        }
    }
}
