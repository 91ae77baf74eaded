//! HS256 session tokens issued to admins on login

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::admin::AdminUser;
use crate::domain::DomainError;

/// `iss` claim stamped on and required from every session token
pub const SESSION_ISSUER: &str = "bzk-admin-api";

/// Longer configured lifetimes are clamped to one year
const MAX_SESSION_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Admin id
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    fn issue(admin: &AdminUser, issued_at: DateTime<Utc>, ttl_hours: u64) -> Self {
        let ttl_hours = i64::try_from(ttl_hours.min(MAX_SESSION_HOURS)).unwrap_or(24);
        let expires_at = issued_at + Duration::hours(ttl_hours);

        Self {
            sub: admin.id().to_string(),
            email: admin.email().to_string(),
            iss: SESSION_ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn admin_id(&self) -> &str {
        &self.sub
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new("change-me-in-production", 24)
    }
}

/// Issues and checks admin session tokens
pub trait JwtGenerator: Send + Sync + Debug {
    fn generate(&self, admin: &AdminUser) -> Result<String, DomainError>;

    /// Signature, expiry and issuer must all check out
    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError>;

    fn expiration_hours(&self) -> u64;
}

#[derive(Clone)]
pub struct JwtService {
    expiration_hours: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            expiration_hours: config.expiration_hours,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_hours", &self.expiration_hours)
            .finish_non_exhaustive()
    }
}

impl JwtGenerator for JwtService {
    fn generate(&self, admin: &AdminUser) -> Result<String, DomainError> {
        let claims = JwtClaims::issue(admin, Utc::now(), self.expiration_hours);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to sign session token: {}", e)))
    }

    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DomainError::validation(format!("Invalid session token: {}", e)))
    }

    fn expiration_hours(&self) -> u64 {
        self.expiration_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::admin::AdminId;

    fn admin() -> AdminUser {
        AdminUser::new(AdminId::generate(), "ops@bzk.example", "Ops", "hash")
    }

    fn sign(claims: &JwtClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_carries_admin() {
        let service = JwtService::new(JwtConfig::new("test-secret", 1));
        let admin = admin();

        let claims = service.validate(&service.generate(&admin).unwrap()).unwrap();

        assert_eq!(claims.admin_id(), admin.id().to_string());
        assert_eq!(claims.email, "ops@bzk.example");
        assert_eq!(claims.iss, SESSION_ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = JwtService::new(JwtConfig::new("secret-a", 1))
            .generate(&admin())
            .unwrap();

        assert!(JwtService::new(JwtConfig::new("secret-b", 1)).validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(JwtConfig::new("test-secret", 1));
        let claims = JwtClaims::issue(&admin(), Utc::now() - Duration::hours(3), 1);

        assert!(service.validate(&sign(&claims, "test-secret")).is_err());
    }

    #[test]
    fn test_other_issuer_rejected() {
        let service = JwtService::new(JwtConfig::new("test-secret", 1));
        let mut claims = JwtClaims::issue(&admin(), Utc::now(), 1);
        claims.iss = "someone-else".to_string();

        assert!(service.validate(&sign(&claims, "test-secret")).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = JwtService::new(JwtConfig::default());
        assert!(service.validate("not.a.jwt").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let service = JwtService::new(JwtConfig::new("super-secret", 1));
        assert!(!format!("{:?}", service).contains("super-secret"));
    }
}
