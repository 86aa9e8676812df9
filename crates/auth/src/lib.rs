//! `flowgic-auth`: token checking and role-based authorization.
//!
//! Decoupled from HTTP and storage: the API layer extracts tokens and maps
//! roles to permissions, this crate only decides.

pub mod authorize;
pub mod claims;
pub mod csrf;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use csrf::{CsrfError, CsrfTokens};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::CompanyMembership;
pub use roles::Role;
