use flowgic_auth::Role;
use flowgic_core::{CompanyId, UserId};

/// Company (tenant) context for a request.
///
/// Immutable; present on every authenticated route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompanyContext {
    company_id: CompanyId,
}

impl CompanyContext {
    pub fn new(company_id: CompanyId) -> Self {
        Self { company_id }
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }
}

/// Authenticated user and the roles granted by the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Dispatchers and managers see financials and every order.
    pub fn is_staff(&self) -> bool {
        self.roles.iter().any(|r| r.is_staff() || *r == Role::ADMIN)
    }
}
