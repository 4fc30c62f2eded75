//! Principal record model and the inputs that create or change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{RoleId, UserId};

use crate::{AuthError, AuthResult, FieldError, validate_password};

const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 500;

/// Trimmed, lower-cased form used for storage and lookups.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_email(field: &str, email: &str) -> Result<(), FieldError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FieldError::new(field, "must be a valid email address"))
    }
}

fn validate_name(field: &str, name: &str) -> Result<(), FieldError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(FieldError::new(field, format!("must be at most {MAX_NAME_LEN} characters")));
    }
    Ok(())
}

fn collect(errors: Vec<FieldError>) -> AuthResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stored record
// ─────────────────────────────────────────────────────────────────────────────

/// A principal as persisted by the user store.
///
/// Holds secrets (`password_hash`, reset token); never serialize it to a
/// caller. Use [`UserProfile`] for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role_id: RoleId,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh, active principal. `password_hash` must already be hashed.
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: String,
        role_id: RoleId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            is_active: true,
            last_login: None,
            phone: None,
            bio: None,
            avatar_url: None,
            role_id,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.updated_at = now;
    }

    pub fn set_reset_token(&mut self, token: String, expires: DateTime<Utc>, now: DateTime<Utc>) {
        self.password_reset_token = Some(token);
        self.password_reset_expires = Some(expires);
        self.updated_at = now;
    }

    pub fn clear_reset_token(&mut self, now: DateTime<Utc>) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
        self.updated_at = now;
    }

    pub fn set_active(&mut self, active: bool, now: DateTime<Utc>) {
        self.is_active = active;
        self.updated_at = now;
    }

    pub fn set_role(&mut self, role_id: RoleId, now: DateTime<Utc>) {
        self.role_id = role_id;
        self.updated_at = now;
    }

    /// Take the editable profile fields of `other`, leaving credentials,
    /// status and role untouched.
    pub fn copy_profile_from(&mut self, other: &User) {
        self.first_name = other.first_name.clone();
        self.last_name = other.last_name.clone();
        self.email = other.email.clone();
        self.phone = other.phone.clone();
        self.bio = other.bio.clone();
        self.avatar_url = other.avatar_url.clone();
        self.updated_at = other.updated_at;
    }

    /// The stored reset token equals `token` and has not expired at `now`.
    pub fn reset_token_matches(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.password_reset_token, self.password_reset_expires) {
            (Some(stored), Some(expires)) => stored == token && expires > now,
            _ => false,
        }
    }
}

/// Secret-free view of a principal, safe to return and to audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role_id: RoleId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            last_login: user.last_login,
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            role_id: user.role_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Self-registration input. Without `role_id` the default role is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

impl Registration {
    pub fn validate(&self) -> AuthResult<()> {
        let errors = [
            validate_name("first_name", &self.first_name),
            validate_name("last_name", &self.last_name),
            validate_email("email", &normalize_email(&self.email)),
            validate_password("password", &self.password),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();
        collect(errors)
    }
}

/// Partial profile change. Absent fields are left alone; an empty string
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> AuthResult<()> {
        let mut errors = Vec::new();
        if let Some(name) = &self.first_name {
            errors.extend(validate_name("first_name", name).err());
        }
        if let Some(name) = &self.last_name {
            errors.extend(validate_name("last_name", name).err());
        }
        if let Some(email) = &self.email {
            errors.extend(validate_email("email", &normalize_email(email)).err());
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                errors.push(FieldError::new("bio", format!("must be at most {MAX_BIO_LEN} characters")));
            }
        }
        collect(errors)
    }

    /// Normalized new email, if the update changes it.
    pub fn email_change(&self, current: &str) -> Option<String> {
        self.email
            .as_deref()
            .map(normalize_email)
            .filter(|email| email != current)
    }

    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = self.first_name {
            user.first_name = name.trim().to_string();
        }
        if let Some(name) = self.last_name {
            user.last_name = name.trim().to_string();
        }
        if let Some(email) = self.email {
            user.email = normalize_email(&email);
        }
        if let Some(phone) = self.phone {
            user.phone = non_empty(phone);
        }
        if let Some(bio) = self.bio {
            user.bio = non_empty(bio);
        }
        if let Some(url) = self.avatar_url {
            user.avatar_url = non_empty(url);
        }
        user.updated_at = now;
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
