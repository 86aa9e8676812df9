use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "orders.status.update").
///
/// `"*"` is the wildcard granted to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ALL: Permission = Permission(Cow::Borrowed("*"));

    pub const ORDERS_READ: Permission = Permission(Cow::Borrowed("orders.read"));
    pub const ORDERS_CREATE: Permission = Permission(Cow::Borrowed("orders.create"));
    pub const ORDERS_ASSIGN: Permission = Permission(Cow::Borrowed("orders.assign"));
    pub const ORDERS_STATUS_UPDATE: Permission = Permission(Cow::Borrowed("orders.status.update"));
    pub const ORDERS_FINANCIALS_UPDATE: Permission =
        Permission(Cow::Borrowed("orders.financials.update"));
    pub const ORDERS_PAYMENT_UPDATE: Permission = Permission(Cow::Borrowed("orders.payment.update"));
    pub const ORDERS_EVENTS_READ: Permission = Permission(Cow::Borrowed("orders.events.read"));

    pub const VEHICLES_READ: Permission = Permission(Cow::Borrowed("vehicles.read"));
    pub const VEHICLES_MANAGE: Permission = Permission(Cow::Borrowed("vehicles.manage"));

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
