//! Server configuration read from the process environment.

use std::net::SocketAddr;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use flowgic_infra::command_dispatcher::DEFAULT_MAX_RETRIES;
use flowgic_logistics::FuelPolicy;

pub const BIND_ADDR_ENV: &str = "FLOWGIC_BIND_ADDR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const CSRF_TTL_ENV: &str = "CSRF_TOKEN_TTL_SECS";
pub const FUEL_CONSUMPTION_ENV: &str = "FUEL_CONSUMPTION_L_PER_100KM";
pub const FUEL_PRICE_ENV: &str = "FUEL_PRICE_PER_LITER";
pub const MAX_RETRIES_ENV: &str = "DISPATCH_MAX_RETRIES";

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_CSRF_TTL_SECS: i64 = 3600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub csrf_ttl: chrono::Duration,
    pub fuel_policy: FuelPolicy,
    pub dispatch_max_retries: u32,
}

impl ApiConfig {
    /// Defaults with an explicit signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            csrf_ttl: chrono::Duration::seconds(DEFAULT_CSRF_TTL_SECS),
            fuel_policy: FuelPolicy::default(),
            dispatch_max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Unset keys fall back to defaults,
    /// malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup(JWT_SECRET_ENV).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let mut config = Self::new(jwt_secret);
        if let Some(addr) = parse_var::<SocketAddr>(&lookup, BIND_ADDR_ENV)? {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse_var::<i64>(&lookup, CSRF_TTL_ENV)? {
            if secs <= 0 {
                return Err(ConfigError::Invalid {
                    key: CSRF_TTL_ENV,
                    value: secs.to_string(),
                });
            }
            config.csrf_ttl = chrono::Duration::seconds(secs);
        }

        if let Some(v) = parse_var::<Decimal>(&lookup, FUEL_CONSUMPTION_ENV)? {
            config.fuel_policy.consumption_l_per_100km = v;
        }
        if let Some(v) = parse_var::<Decimal>(&lookup, FUEL_PRICE_ENV)? {
            config.fuel_policy.price_per_liter = v;
        }
        if let Some(v) = parse_var::<u32>(&lookup, MAX_RETRIES_ENV)? {
            config.dispatch_max_retries = v;
        }

        Ok(config)
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_fuel_policy(mut self, policy: FuelPolicy) -> Self {
        self.fuel_policy = policy;
        self
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { key, value: raw.clone() })
        })
        .transpose()
}
