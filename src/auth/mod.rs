use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Session claims as issued by the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, audience: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role: "authenticated".to_string(),
            aud: audience.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session secret not configured")]
    InvalidSecret,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),
}

/// HS256 keys plus the audience every session token must carry
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    audience: String,
}

impl SessionKeys {
    pub fn new(secret: &str, audience: impl Into<String>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.into(),
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, SessionError> {
        Self::new(&security.jwt_secret, security.jwt_audience.clone())
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", "authenticated").unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let user = Uuid::new_v4();
        let claims = Claims::new(user, Some("a@b.co".into()), "authenticated", Duration::hours(1));
        let token = keys.issue(&claims).unwrap();

        let verified = keys.verify(&token).unwrap();
        assert_eq!(verified.sub, user);
        assert_eq!(verified.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let claims = Claims::new(Uuid::new_v4(), None, "authenticated", Duration::hours(-2));
        let token = keys.issue(&claims).unwrap();
        assert!(matches!(keys.verify(&token), Err(SessionError::InvalidToken(_))));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let keys = keys();
        let claims = Claims::new(Uuid::new_v4(), None, "anon", Duration::hours(1));
        let token = keys.issue(&claims).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = SessionKeys::new("other-secret", "authenticated").unwrap();
        let claims = Claims::new(Uuid::new_v4(), None, "authenticated", Duration::hours(1));
        let token = other.issue(&claims).unwrap();
        assert!(keys().verify(&token).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(SessionKeys::new("", "authenticated"), Err(SessionError::InvalidSecret)));
    }
}
