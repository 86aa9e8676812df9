use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use flowgic_auth::Permission;

use crate::app::{errors, routes::guard, services::AppServices};
use crate::context::{CompanyContext, PrincipalContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(json!({
        "company_id": company.company_id().to_string(),
        "user_id": principal.user_id().to_string(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}

/// Issue an anti-forgery token bound to the caller.
pub async fn csrf_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(company): Extension<CompanyContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    guard(&company, &principal, &Permission::ORDERS_READ)?;

    let token = services.issue_csrf(&company, &principal).map_err(|e| {
        tracing::error!(error = %e, "failed to issue csrf token");
        errors::json_failure(StatusCode::INTERNAL_SERVER_ERROR, errors::INTERNAL)
    })?;

    Ok(Json(json!({ "csrf_token": token })).into_response())
}
