//! Anti-forgery tokens for mutating requests.
//!
//! A token is a short-lived HS256 JWT bound to one user in one company, so a
//! token lifted from another session cannot be replayed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowgic_core::{CompanyId, UserId};

const PURPOSE: &str = "csrf";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[error("csrf token missing")]
    Missing,

    #[error("csrf token malformed: {0}")]
    Malformed(String),

    #[error("csrf token expired")]
    Expired,

    #[error("csrf token issued to another principal")]
    Mismatch,

    #[error("failed to sign csrf token: {0}")]
    Sign(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct CsrfClaims {
    sub: UserId,
    company_id: CompanyId,
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies CSRF tokens with a shared secret.
pub struct CsrfTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl CsrfTokens {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user: UserId, company: CompanyId, now: DateTime<Utc>) -> Result<String, CsrfError> {
        let claims = CsrfClaims {
            sub: user,
            company_id: company,
            purpose: PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CsrfError::Sign(e.to_string()))
    }

    pub fn verify(
        &self,
        token: Option<&str>,
        user: UserId,
        company: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<(), CsrfError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or(CsrfError::Missing)?;

        let claims = jsonwebtoken::decode::<CsrfClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| CsrfError::Malformed(e.to_string()))?
            .claims;

        if claims.purpose != PURPOSE {
            return Err(CsrfError::Malformed("wrong purpose".into()));
        }
        if now.timestamp() >= claims.exp {
            return Err(CsrfError::Expired);
        }
        if claims.sub != user || claims.company_id != company {
            return Err(CsrfError::Mismatch);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> CsrfTokens {
        CsrfTokens::new("csrf-secret", Duration::hours(1))
    }

    #[test]
    fn issued_token_verifies_for_same_principal() {
        let (user, company, now) = (UserId::new(), CompanyId::new(), Utc::now());
        let t = tokens();
        let token = t.issue(user, company, now).unwrap();

        assert_eq!(t.verify(Some(&token), user, company, now), Ok(()));
    }

    #[test]
    fn token_is_bound_to_user_and_company() {
        let (user, company, now) = (UserId::new(), CompanyId::new(), Utc::now());
        let t = tokens();
        let token = t.issue(user, company, now).unwrap();

        assert_eq!(
            t.verify(Some(&token), UserId::new(), company, now),
            Err(CsrfError::Mismatch)
        );
        assert_eq!(
            t.verify(Some(&token), user, CompanyId::new(), now),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn missing_blank_expired_and_forged_tokens_fail() {
        let (user, company, now) = (UserId::new(), CompanyId::new(), Utc::now());
        let t = tokens();
        let token = t.issue(user, company, now).unwrap();

        assert_eq!(t.verify(None, user, company, now), Err(CsrfError::Missing));
        assert_eq!(t.verify(Some("  "), user, company, now), Err(CsrfError::Missing));
        assert_eq!(
            t.verify(Some(&token), user, company, now + Duration::hours(2)),
            Err(CsrfError::Expired)
        );

        let forged = CsrfTokens::new("other", Duration::hours(1))
            .issue(user, company, now)
            .unwrap();
        assert!(matches!(
            t.verify(Some(&forged), user, company, now),
            Err(CsrfError::Malformed(_))
        ));
    }
}
