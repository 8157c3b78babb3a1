use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::AppState;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";

/// The identity performing an operation. Always passed explicitly into
/// services; nothing in this crate reads identity from ambient state.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_role(&self, role: &str) -> Result<(), ServiceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "user {} lacks role {role}",
                self.username
            )))
        }
    }
}

/// JWT claims carried by caller and service tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and verifies HS256 tokens. The HTTP collaborator clients use this
/// to mint a short-lived service token for the acting user, mirroring how
/// the cart collaborator authenticates internal calls.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, username: &str, roles: &[&str]) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {e}")))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = TokenIssuer::new(state.config.jwt_secret.clone(), 0).verify(token)?;
        Ok(Identity::new(claims.sub, claims.roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_round_trip() {
        let issuer = TokenIssuer::new("a_secret_that_is_long_enough_for_tests", 60);
        let token = issuer.issue("alice", &[ROLE_USER]).expect("issue token");
        let claims = issuer.verify(&token).expect("verify token");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec![ROLE_USER.to_string()]);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let issuer = TokenIssuer::new("a_secret_that_is_long_enough_for_tests", 60);
        let other = TokenIssuer::new("a_different_secret_equally_long_here", 60);
        let token = issuer.issue("alice", &[ROLE_USER]).expect("issue token");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn role_gate_rejects_missing_role() {
        let identity = Identity::new("bob", vec![ROLE_USER.to_string()]);
        assert!(identity.require_role(ROLE_USER).is_ok());
        assert!(matches!(
            identity.require_role(ROLE_ADMIN),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
