use serde::{Deserialize, Serialize};

use flowgic_core::CompanyId;

use crate::{Permission, Role};

/// Roles a user holds in one company, and the permissions they expand to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMembership {
    pub company_id: CompanyId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}
