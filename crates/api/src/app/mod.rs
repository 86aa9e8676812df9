//! HTTP application wiring (axum router + services).
//!
//! - `services.rs`: event store, bus, dispatcher, projection worker
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response shapes
//! - `errors.rs`: the JSON failure contract

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use flowgic_auth::Hs256JwtValidator;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router. Spawns the order projection worker.
pub fn build_app(config: &ApiConfig) -> std::io::Result<Router> {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(config)?);

    // Protected routes: require a bearer token and company context.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_tracing))))
}
