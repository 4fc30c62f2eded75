//! Session lifecycle: register, login, refresh, logout and password flows.
//!
//! This is the only component that issues credentials. Successful operations
//! are audited by the caller through the interceptor; rejected logins are
//! recorded here because they never produce a successful result to intercept.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use warden_auth::{
    AuditAction, AuditRecord, AuthError, AuthResult, PasswordHasher, Principal, Registration, ResourceKind,
    TokenIssuer, TokenPair, User, UserProfile, DEFAULT_ROLE_NAME, normalize_email, validate_password,
};
use warden_core::UserId;

use super::{hash_password, role_of, verify_password};
use crate::audit::{AuditWriter, RequestMeta};
use crate::notify::ResetNotifier;
use crate::store::{RoleStore, StoreError, UserStore};

/// Verified against on logins for unknown emails, so they cost one bcrypt
/// verification just like a wrong password does.
const DECOY_PASSWORD: &str = "warden-decoy-password";

/// Result of register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

pub struct SessionManager {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    audit: AuditWriter,
    notifier: Arc<dyn ResetNotifier>,
    decoy_hash: OnceCell<String>,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
        audit: AuditWriter,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            users,
            roles,
            issuer,
            hasher,
            audit,
            notifier,
            decoy_hash: OnceCell::new(),
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[instrument(skip(self, input), err)]
    pub async fn register(&self, input: Registration) -> AuthResult<AuthSession> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let role = match input.role_id {
            Some(role_id) => {
                let role = self.roles.get(role_id).await?.ok_or(AuthError::NotFound("role"))?;
                role.ensure_self_assignable()?;
                role
            }
            None => self
                .roles
                .find_by_name(DEFAULT_ROLE_NAME)
                .await?
                .ok_or_else(|| AuthError::internal(format!("default role '{DEFAULT_ROLE_NAME}' is missing")))?,
        };

        let password_hash = hash_password(self.hasher, input.password).await?;
        let user = User::new(
            &input.first_name,
            &input.last_name,
            &email,
            password_hash,
            role.id,
            Utc::now(),
        );
        let user = self.users.insert(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::DuplicateEmail,
            other => other.into(),
        })?;

        let tokens = self.issuer.issue_pair(&Principal::resolve(&user, &role))?;
        info!(user_id = %user.id, role = %role.name, "principal registered");
        Ok(AuthSession {
            user: user.profile(),
            tokens,
        })
    }

    /// Password is checked before the active flag, and both failures look the
    /// same to a caller who does not know the password.
    #[instrument(skip(self, password, meta), err)]
    pub async fn login(&self, email: &str, password: &str, meta: &RequestMeta) -> AuthResult<AuthSession> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.verify_decoy(password).await?;
            return Err(self.reject_login(&email, AuthError::InvalidCredentials, meta).await);
        };
        if !verify_password(self.hasher, password.to_string(), user.password_hash.clone()).await? {
            return Err(self.reject_login(&email, AuthError::InvalidCredentials, meta).await);
        }
        if !user.is_active {
            return Err(self.reject_login(&email, AuthError::AccountInactive, meta).await);
        }

        let user = match self.users.record_login(user.id, Utc::now()).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                return Err(self.reject_login(&email, AuthError::InvalidCredentials, meta).await);
            }
            Err(err) => return Err(err.into()),
        };
        // Deactivated after the check above.
        if !user.is_active {
            return Err(self.reject_login(&email, AuthError::AccountInactive, meta).await);
        }

        let role = role_of(self.roles.as_ref(), user.role_id).await?;
        let tokens = self.issuer.issue_pair(&Principal::resolve(&user, &role))?;
        info!(user_id = %user.id, "login succeeded");
        Ok(AuthSession {
            user: user.profile(),
            tokens,
        })
    }

    async fn verify_decoy(&self, password: &str) -> AuthResult<()> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| hash_password(self.hasher, DECOY_PASSWORD.to_string()))
            .await?;
        verify_password(self.hasher, password.to_string(), decoy.clone()).await?;
        Ok(())
    }

    async fn reject_login(&self, email: &str, reason: AuthError, meta: &RequestMeta) -> AuthError {
        let reason_tag = match reason {
            AuthError::AccountInactive => "account_inactive",
            _ => "invalid_credentials",
        };
        warn!(email = %email, reason = reason_tag, "login rejected");

        let record = AuditRecord::new(AuditAction::LoginFailed, ResourceKind::Auth)
            .after(json!({ "email": email, "reason": reason_tag }))
            .origin(meta.ip_address.clone(), meta.user_agent.clone());
        self.audit.record(record).await;
        reason
    }

    /// Mint a new pair from a valid refresh token. The presented token stays valid
    /// until it expires.
    #[instrument(skip(self, refresh_token), err)]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.issuer.verify_refresh(refresh_token)?;
        let user = self.users.get(claims.sub).await?.ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }
        let role = role_of(self.roles.as_ref(), user.role_id).await?;
        self.issuer.issue_pair(&Principal::resolve(&user, &role))
    }

    /// Always succeeds for a well-formed request, whether or not the account exists.
    #[instrument(skip(self, email), err)]
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let now = Utc::now();
        let token = self.issuer.issue_password_reset(user.id)?;
        let stored = self
            .users
            .set_reset_token(user.id, token.clone(), now + self.issuer.reset_ttl(), now)
            .await;
        let user = match stored {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                debug!(user_id = %user.id, "principal removed before reset token was stored");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self.notifier.send_reset(&user.profile(), &token).await {
            error!(user_id = %user.id, error = %err, "failed to deliver password reset");
        }
        Ok(())
    }

    /// Single use: the token is redeemed and cleared in one store write, so
    /// concurrent redemptions of the same token succeed at most once.
    #[instrument(skip(self, token, new_password), err)]
    pub async fn reset_password(&self, token: &str, new_password: String) -> AuthResult<UserProfile> {
        validate_password("password", &new_password).map_err(|e| AuthError::Validation(vec![e]))?;

        let claims = self.issuer.verify_password_reset(token)?;
        let user = self.users.get(claims.sub).await?.ok_or(AuthError::InvalidToken)?;
        if !user.reset_token_matches(token, Utc::now()) {
            return Err(AuthError::InvalidToken);
        }

        let hash = hash_password(self.hasher, new_password).await?;
        let user = self
            .users
            .redeem_reset_token(user.id, token, hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        info!(user_id = %user.id, "password reset completed");
        Ok(user.profile())
    }

    /// Existing credentials are not rotated. The new hash only replaces the
    /// one `current_password` was checked against.
    #[instrument(skip(self, current_password, new_password), fields(user_id = %user_id), err)]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: String,
        new_password: String,
    ) -> AuthResult<UserProfile> {
        validate_password("new_password", &new_password).map_err(|e| AuthError::Validation(vec![e]))?;
        if new_password == current_password {
            return Err(AuthError::invalid_field(
                "new_password",
                "must differ from the current password",
            ));
        }

        let user = self.users.get(user_id).await?.ok_or(AuthError::NotFound("user"))?;
        if !verify_password(self.hasher, current_password, user.password_hash.clone()).await? {
            return Err(AuthError::invalid_field("current_password", "is incorrect"));
        }

        let hash = hash_password(self.hasher, new_password).await?;
        let user = self
            .users
            .replace_password_hash(user.id, &user.password_hash, hash, Utc::now())
            .await?
            .ok_or_else(|| AuthError::invalid_field("current_password", "is incorrect"))?;

        info!(user_id = %user.id, "password changed");
        Ok(user.profile())
    }

    /// Stateless: nothing is revoked.
    pub async fn logout(&self, principal: &Principal) -> AuthResult<()> {
        info!(user_id = %principal.id, "logout");
        Ok(())
    }
}
