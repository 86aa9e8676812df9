//! API-side authorization guard.
//!
//! Authorization happens at the request boundary (before any command is
//! built or dispatched); the domain and infra crates stay auth-agnostic.

use flowgic_auth::{AuthzError, CompanyMembership, Permission, Principal, Role, authorize};

use crate::context::{CompanyContext, PrincipalContext};

/// Check one permission for the current request context.
pub fn authorize_request(
    company: &CompanyContext,
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), AuthzError> {
    authorize(&resolve_principal(company, principal), required)
}

fn resolve_principal(company: &CompanyContext, principal: &PrincipalContext) -> Principal {
    let membership = CompanyMembership {
        company_id: company.company_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_from_roles(principal.roles()),
    };

    Principal {
        user_id: principal.user_id(),
        active_company_id: company.company_id(),
        membership,
    }
}

/// Role → permission policy.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in roles {
        let granted: Vec<Permission> = match role.as_str() {
            "admin" => vec![Permission::ALL],
            "dispatcher" | "manager" => vec![
                Permission::ORDERS_READ,
                Permission::ORDERS_CREATE,
                Permission::ORDERS_ASSIGN,
                Permission::ORDERS_STATUS_UPDATE,
                Permission::ORDERS_FINANCIALS_UPDATE,
                Permission::ORDERS_PAYMENT_UPDATE,
                Permission::ORDERS_EVENTS_READ,
                Permission::VEHICLES_READ,
                Permission::VEHICLES_MANAGE,
            ],
            "customer" => vec![Permission::ORDERS_READ, Permission::ORDERS_CREATE],
            "driver" => vec![Permission::ORDERS_READ, Permission::VEHICLES_READ],
            _ => Vec::new(),
        };
        for perm in granted {
            if !out.contains(&perm) {
                out.push(perm);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgic_core::{CompanyId, UserId};

    fn ctx(roles: Vec<Role>) -> (CompanyContext, PrincipalContext) {
        (
            CompanyContext::new(CompanyId::new()),
            PrincipalContext::new(UserId::new(), roles),
        )
    }

    #[test]
    fn staff_may_update_orders_but_drivers_may_not() {
        let (company, dispatcher) = ctx(vec![Role::DISPATCHER]);
        let required = Permission::ORDERS_STATUS_UPDATE;
        assert!(authorize_request(&company, &dispatcher, &required).is_ok());

        let (company, driver) = ctx(vec![Role::DRIVER]);
        assert_eq!(
            authorize_request(&company, &driver, &required),
            Err(AuthzError::Forbidden("orders.status.update".into()))
        );
        assert!(authorize_request(&company, &driver, &Permission::ORDERS_READ).is_ok());
    }

    #[test]
    fn customers_can_create_and_admins_can_do_anything() {
        let (company, customer) = ctx(vec![Role::CUSTOMER]);
        assert!(authorize_request(&company, &customer, &Permission::ORDERS_CREATE).is_ok());
        assert!(authorize_request(&company, &customer, &Permission::ORDERS_PAYMENT_UPDATE).is_err());

        let (company, admin) = ctx(vec![Role::ADMIN]);
        assert!(authorize_request(&company, &admin, &Permission::ORDERS_EVENTS_READ).is_ok());
    }

    #[test]
    fn unknown_roles_grant_nothing_and_duplicates_collapse() {
        assert!(permissions_from_roles(&[Role::new("auditor")]).is_empty());
        let merged = permissions_from_roles(&[Role::DISPATCHER, Role::MANAGER]);
        assert_eq!(merged.len(), 9);
    }

    #[test]
    fn only_staff_manage_the_fleet() {
        let (company, manager) = ctx(vec![Role::MANAGER]);
        assert!(authorize_request(&company, &manager, &Permission::VEHICLES_MANAGE).is_ok());

        let (company, driver) = ctx(vec![Role::DRIVER]);
        assert!(authorize_request(&company, &driver, &Permission::VEHICLES_READ).is_ok());
        assert_eq!(
            authorize_request(&company, &driver, &Permission::VEHICLES_MANAGE),
            Err(AuthzError::Forbidden("vehicles.manage".into()))
        );

        let (company, customer) = ctx(vec![Role::CUSTOMER]);
        assert!(authorize_request(&company, &customer, &Permission::VEHICLES_READ).is_err());
    }
}
