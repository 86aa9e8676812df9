use thiserror::Error;

use flowgic_core::{CompanyId, UserId};

use crate::{CompanyMembership, Permission};

/// Who is asking, and what they hold in the company they act for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub active_company_id: CompanyId,
    pub membership: CompanyMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("company mismatch")]
    CompanyMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Pure check: the membership must belong to the active company and grant
/// `required` or the wildcard.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_company_id != principal.membership.company_id {
        return Err(AuthzError::CompanyMismatch);
    }

    let permissions = &principal.membership.permissions;
    if permissions.iter().any(|p| p.is_wildcard() || p == required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal(company: CompanyId, membership_company: CompanyId, perms: Vec<Permission>) -> Principal {
        Principal {
            user_id: UserId::new(),
            active_company_id: company,
            membership: CompanyMembership {
                company_id: membership_company,
                roles: vec![Role::DISPATCHER],
                permissions: perms,
            },
        }
    }

    #[test]
    fn granted_permission_passes_and_missing_one_is_forbidden() {
        let c = CompanyId::new();
        let p = principal(c, c, vec![Permission::ORDERS_STATUS_UPDATE]);

        assert!(authorize(&p, &Permission::ORDERS_STATUS_UPDATE).is_ok());
        assert_eq!(
            authorize(&p, &Permission::ORDERS_FINANCIALS_UPDATE),
            Err(AuthzError::Forbidden("orders.financials.update".into()))
        );
    }

    #[test]
    fn wildcard_grants_everything() {
        let c = CompanyId::new();
        let p = principal(c, c, vec![Permission::ALL]);
        assert!(authorize(&p, &Permission::ORDERS_EVENTS_READ).is_ok());
    }

    #[test]
    fn membership_in_another_company_is_rejected() {
        let p = principal(CompanyId::new(), CompanyId::new(), vec![Permission::ALL]);
        assert_eq!(
            authorize(&p, &Permission::ORDERS_READ),
            Err(AuthzError::CompanyMismatch)
        );
    }
}
