//! Signed session tokens (HS256).
//!
//! Two independent credentials are minted at login: a short-lived access
//! token and a longer-lived refresh token, each signed with its own
//! secret. Both bind (user id, role). Verification is stateless; there
//! is no server-side revocation list.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketplace_core::{Role, UserId};

use crate::config::JwtConfig;

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed (malformed key, serialization).
    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    /// Bad signature, wrong token kind, or past expiry.
    #[error("invalid or expired token")]
    Invalid,
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: i32,
    /// Role at issue time.
    pub role: Role,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Issues and verifies the access/refresh token pair.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    /// Build the service from config.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let access_secret = config.secret.expose_secret().as_bytes();
        let refresh_secret = config.refresh_secret.expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_secs: config.expires_in_secs,
            refresh_ttl_secs: config.refresh_expires_in_secs,
        }
    }

    /// Access token lifetime in seconds (for cookie max-age).
    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    /// Refresh token lifetime in seconds (for cookie max-age).
    #[must_use]
    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Mint an access token for (user, role).
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue_access(&self, user: UserId, role: Role) -> Result<String, TokenError> {
        sign(&self.access_encoding, user, role, self.access_ttl_secs)
    }

    /// Mint a refresh token for (user, role).
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue_refresh(&self, user: UserId, role: Role) -> Result<String, TokenError> {
        sign(&self.refresh_encoding, user, role, self.refresh_ttl_secs)
    }

    /// Verify an access token, returning its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] on bad signature or expiry.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access_decoding, token)
    }

    /// Verify a refresh token, returning its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] on bad signature or expiry.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.refresh_decoding, token)
    }
}

fn sign(key: &EncodingKey, user: UserId, role: Role, ttl_secs: i64) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.as_i32(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
    };
    Ok(encode(&Header::default(), &claims, key)?)
}

fn verify(key: &DecodingKey, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from("access-secret-0123456789-0123456789"),
            refresh_secret: SecretString::from("refresh-secret-0123456789-0123456789"),
            expires_in_secs: 900,
            refresh_expires_in_secs: 3600,
        })
    }

    #[test]
    fn test_access_roundtrip() {
        let svc = service();
        let token = svc.issue_access(UserId::new(7), Role::Customer).unwrap();
        let claims = svc.verify_access(&token).unwrap();
        assert_eq!(claims.user_id(), UserId::new(7));
        assert_eq!(claims.role, Role::Customer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_kinds_not_interchangeable() {
        let svc = service();
        let access = svc.issue_access(UserId::new(1), Role::Admin).unwrap();
        let refresh = svc.issue_refresh(UserId::new(1), Role::Admin).unwrap();

        assert!(svc.verify_refresh(&access).is_err());
        assert!(svc.verify_access(&refresh).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let svc = service();
        assert!(matches!(
            svc.verify_access("not.a.token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let mut token = svc.issue_access(UserId::new(1), Role::Customer).unwrap();
        token.push('x');
        assert!(svc.verify_access(&token).is_err());
    }
}
