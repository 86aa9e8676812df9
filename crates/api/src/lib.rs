//! HTTP API: order status and financial update endpoints.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;

pub use config::ApiConfig;
