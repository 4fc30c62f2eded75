//! Credential issuer: mints and verifies stateless HS256 bearer tokens.
//!
//! Access and refresh tokens are signed with *different* secrets, so one
//! secret leaking cannot forge the other class. Password-reset tokens reuse
//! the access secret but carry `type: "password-reset"`, and every
//! verification checks the `type` tag after the signature.
//!
//! Verification failures (bad signature, expired, malformed) all collapse to
//! [`AuthError::InvalidToken`].

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use warden_core::UserId;

use crate::{
    AccessClaims, AuthError, AuthResult, PasswordResetClaims, Principal, RefreshClaims, TokenKind,
};

/// Secrets and lifetimes for the issuer.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub reset_ttl: Duration,
}

impl TokenConfig {
    /// Default lifetimes: 15 minutes access, 7 days refresh, 1 hour reset.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            reset_ttl: Duration::hours(1),
        }
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("{0} secret must not be empty")]
    EmptySecret(&'static str),

    #[error("access and refresh secrets must differ")]
    SharedSecret,
}

/// Access + refresh credentials handed out on login, register and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Result<Self, TokenConfigError> {
        if config.access_secret.is_empty() {
            return Err(TokenConfigError::EmptySecret("access"));
        }
        if config.refresh_secret.is_empty() {
            return Err(TokenConfigError::EmptySecret("refresh"));
        }
        if config.access_secret == config.refresh_secret {
            return Err(TokenConfigError::SharedSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            reset_ttl: config.reset_ttl,
        })
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    pub fn issue_access(&self, principal: &Principal) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: principal.id,
            email: principal.email.clone(),
            role_id: principal.role_id,
            permissions: principal.permissions.clone(),
            kind: TokenKind::Access,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        sign(&claims, &self.access_encoding)
    }

    pub fn issue_refresh(&self, user_id: UserId) -> AuthResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            kind: TokenKind::Refresh,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        sign(&claims, &self.refresh_encoding)
    }

    pub fn issue_pair(&self, principal: &Principal) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(principal)?,
            refresh_token: self.issue_refresh(principal.id)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn issue_password_reset(&self, user_id: UserId) -> AuthResult<String> {
        let now = Utc::now();
        let claims = PasswordResetClaims {
            sub: user_id,
            kind: TokenKind::PasswordReset,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + self.reset_ttl).timestamp(),
        };
        sign(&claims, &self.access_encoding)
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        self.verify(token, &self.access_decoding, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        self.verify(token, &self.refresh_decoding, TokenKind::Refresh)
    }

    pub fn verify_password_reset(&self, token: &str) -> AuthResult<PasswordResetClaims> {
        self.verify(token, &self.access_decoding, TokenKind::PasswordReset)
    }

    fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
        expected: TokenKind,
    ) -> AuthResult<T> {
        let data = jsonwebtoken::decode::<serde_json::Value>(token, key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        // Purpose is only inspected once the signature is known to be ours.
        let kind = data
            .claims
            .get("type")
            .cloned()
            .and_then(|v| serde_json::from_value::<TokenKind>(v).ok())
            .ok_or(AuthError::InvalidToken)?;
        if kind != expected {
            return Err(AuthError::TokenPurposeMismatch);
        }

        serde_json::from_value(data.claims).map_err(|_| AuthError::InvalidToken)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> AuthResult<String> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PermissionSet;
    use warden_core::RoleId;

    const ACCESS: &str = "access-secret";
    const REFRESH: &str = "refresh-secret";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenConfig::new(ACCESS, REFRESH)).unwrap()
    }

    fn principal() -> Principal {
        Principal {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            role_id: RoleId::new(),
            permissions: PermissionSet::parse_all(["users:read", "roles:*", "users:update:self"]).unwrap(),
        }
    }

    #[test]
    fn access_round_trip_recovers_identity_and_permissions() {
        let issuer = issuer();
        let p = principal();
        let claims = issuer.verify_access(&issuer.issue_access(&p).unwrap()).unwrap();

        assert_eq!(claims.sub, p.id);
        assert_eq!(claims.role_id, p.role_id);
        assert_eq!(claims.email, p.email);
        assert_eq!(claims.permissions, p.permissions);
        assert_eq!(Principal::from(claims), p);
    }

    #[test]
    fn refresh_round_trip_carries_only_subject() {
        let issuer = issuer();
        let id = UserId::new();
        let claims = issuer.verify_refresh(&issuer.issue_refresh(id).unwrap()).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn refresh_signed_with_access_secret_is_rejected() {
        let now = Utc::now();
        let forged = RefreshClaims {
            sub: UserId::new(),
            kind: TokenKind::Refresh,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + Duration::days(1)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &forged,
            &EncodingKey::from_secret(ACCESS.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer().verify_refresh(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let issuer = issuer();
        let access = issuer.issue_access(&principal()).unwrap();
        assert_eq!(issuer.verify_refresh(&access), Err(AuthError::InvalidToken));
    }

    #[test]
    fn reset_and_access_tokens_are_not_interchangeable() {
        let issuer = issuer();
        let p = principal();
        let reset = issuer.issue_password_reset(p.id).unwrap();
        let access = issuer.issue_access(&p).unwrap();

        assert_eq!(issuer.verify_access(&reset), Err(AuthError::TokenPurposeMismatch));
        assert_eq!(issuer.verify_password_reset(&access), Err(AuthError::TokenPurposeMismatch));
        assert_eq!(issuer.verify_password_reset(&reset).unwrap().sub, p.id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut config = TokenConfig::new(ACCESS, REFRESH);
        config.access_ttl = Duration::seconds(-5);
        let issuer = TokenIssuer::new(config).unwrap();
        let token = issuer.issue_access(&principal()).unwrap();
        assert_eq!(issuer.verify_access(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn tampered_or_garbage_token_is_rejected() {
        let issuer = issuer();
        let mut token = issuer.issue_access(&principal()).unwrap();
        token.push('x');
        assert_eq!(issuer.verify_access(&token), Err(AuthError::InvalidToken));
        assert_eq!(issuer.verify_access("not.a.jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn issued_tokens_are_unique() {
        let issuer = issuer();
        let p = principal();
        let a = issuer.issue_pair(&p).unwrap();
        let b = issuer.issue_pair(&p).unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
        assert_eq!(a.expires_in, 15 * 60);
    }

    #[test]
    fn shared_or_empty_secrets_are_refused() {
        assert_eq!(
            TokenIssuer::new(TokenConfig::new("same", "same")).unwrap_err(),
            TokenConfigError::SharedSecret
        );
        assert_eq!(
            TokenIssuer::new(TokenConfig::new("", "x")).unwrap_err(),
            TokenConfigError::EmptySecret("access")
        );
    }
}
