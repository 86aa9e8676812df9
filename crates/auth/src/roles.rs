use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles stay opaque strings; the role → permission mapping lives in the
/// policy layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const DISPATCHER: Role = Role(Cow::Borrowed("dispatcher"));
    pub const DRIVER: Role = Role(Cow::Borrowed("driver"));
    pub const CUSTOMER: Role = Role(Cow::Borrowed("customer"));
    pub const MANAGER: Role = Role(Cow::Borrowed("manager"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Office staff who run orders: dispatchers and managers.
    pub fn is_staff(&self) -> bool {
        matches!(self.as_str(), "dispatcher" | "manager")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
