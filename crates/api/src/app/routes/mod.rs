use axum::{
    Extension, Router,
    http::StatusCode,
    response::Response,
    routing::{MethodRouter, get, post},
};

use flowgic_auth::Permission;

use crate::app::errors;
use crate::authz::authorize_request;
use crate::context::{CompanyContext, PrincipalContext};

pub mod orders;
pub mod system;
pub mod vehicles;

/// Router for all authenticated (company-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/csrf/", only(get(system::csrf_token), Permission::ORDERS_READ))
        .route(
            "/requests/",
            only(
                get(orders::list_orders).post(orders::create_order),
                Permission::ORDERS_READ,
            ),
        )
        .route("/requests/:id/", only(get(orders::get_order), Permission::ORDERS_READ))
        .route(
            "/requests/:id/status/",
            only(post(orders::change_status), Permission::ORDERS_STATUS_UPDATE),
        )
        .route(
            "/requests/:id/update-financials/",
            only(post(orders::update_financials), Permission::ORDERS_FINANCIALS_UPDATE),
        )
        .route(
            "/requests/:id/payment/",
            only(post(orders::update_payment), Permission::ORDERS_PAYMENT_UPDATE),
        )
        .route(
            "/requests/:id/assign/",
            only(post(orders::assign_driver), Permission::ORDERS_ASSIGN),
        )
        .route(
            "/requests/:id/events/",
            only(get(orders::list_order_events), Permission::ORDERS_EVENTS_READ),
        )
        .route(
            "/vehicles/",
            only(
                get(vehicles::list_vehicles).post(vehicles::register_vehicle),
                Permission::VEHICLES_READ,
            ),
        )
        .route("/vehicles/:id/", only(get(vehicles::get_vehicle), Permission::VEHICLES_READ))
        .route(
            "/vehicles/:id/update-status/",
            only(post(vehicles::update_status), Permission::VEHICLES_MANAGE),
        )
        .route(
            "/vehicles/:id/plan-maintenance/",
            only(post(vehicles::plan_maintenance), Permission::VEHICLES_MANAGE),
        )
}

/// Answer unsupported methods with the JSON 405, after the role check so a
/// caller without the route's permission still sees 403 first.
fn only(methods: MethodRouter, required: Permission) -> MethodRouter {
    methods.fallback(
        move |Extension(company): Extension<CompanyContext>,
              Extension(principal): Extension<PrincipalContext>| async move {
            match guard(&company, &principal, &required) {
                Ok(()) => errors::json_failure(StatusCode::METHOD_NOT_ALLOWED, errors::METHOD_NOT_ALLOWED),
                Err(denied) => denied,
            }
        },
    )
}

pub(crate) fn guard(
    company: &CompanyContext,
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), Response> {
    authorize_request(company, principal, required).map_err(|e| {
        tracing::info!(
            user_id = %principal.user_id(),
            company_id = %company.company_id(),
            error = %e,
            "permission denied"
        );
        errors::forbidden()
    })
}
