//! Identity extraction.
//!
//! Authentication itself (registration, login, password handling) lives in
//! the external identity provider; this module only decodes the bearer
//! token it issues and trusts the claims verbatim.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Caller role carried in the token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Organizer,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Organizers and admins may create events.
    pub fn can_manage_events(&self) -> bool {
        matches!(self, Role::Organizer | Role::Admin)
    }
}

/// Claims minted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the buyer id
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verifies bearer tokens; shared through request extensions.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// The authenticated caller, extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let verifier = parts
            .extensions
            .get::<Arc<TokenVerifier>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("token verifier not configured".to_string())
            })?;

        let auth_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("missing Authorization header".to_string())
            })?;

        let token = auth_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| ServiceError::Unauthorized("expected a bearer token".to_string()))?;

        let claims = verifier.verify(token)?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("malformed subject claim".to_string()))?;

        Ok(AuthUser {
            id,
            role: claims.role,
            name: claims.name,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

    fn mint(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_well_formed_token() {
        let verifier = TokenVerifier::new(SECRET);
        let buyer = Uuid::new_v4();
        let token = mint(&Claims {
            sub: buyer.to_string(),
            role: Role::Organizer,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            name: Some("Asha".to_string()),
            email: None,
        });

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, buyer.to_string());
        assert_eq!(claims.role, Role::Organizer);
        assert!(claims.role.can_manage_events());
        assert!(!claims.role.is_admin());
    }

    #[test]
    fn rejects_token_signed_with_other_key() {
        let verifier = TokenVerifier::new(SECRET);
        let token = encode(
            &Header::default(),
            &Claims {
                sub: Uuid::new_v4().to_string(),
                role: Role::User,
                exp: (chrono::Utc::now().timestamp() + 3600) as usize,
                name: None,
                email: None,
            },
            &EncodingKey::from_secret(b"another_secret_entirely_1234567890"),
        )
        .unwrap();

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = mint(&Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::User,
            exp: (chrono::Utc::now().timestamp() - 120) as usize,
            name: None,
            email: None,
        });

        assert!(verifier.verify(&token).is_err());
    }
}
