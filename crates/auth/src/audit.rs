//! Audit record model and secret scrubbing.
//!
//! Records are append-only. Before/after snapshots always pass through
//! [`scrub_secrets`] on the way into a record, so no builder path can store a
//! password hash or a token.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_core::{AuditId, DomainError, UserId};

/// Closed set of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    LoginFailed,
    PasswordChange,
    PasswordReset,
}

impl AuditAction {
    pub const ALL: [AuditAction; 8] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::LoginFailed,
        AuditAction::PasswordChange,
        AuditAction::PasswordReset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::PasswordChange => "PASSWORD_CHANGE",
            AuditAction::PasswordReset => "PASSWORD_RESET",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown audit action '{s}'")))
    }
}

/// Resource category an audit record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Role,
    Auth,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Role => "role",
            ResourceKind::Auth => "auth",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(ResourceKind::User),
            "role" => Ok(ResourceKind::Role),
            "auth" => Ok(ResourceKind::Auth),
            _ => Err(DomainError::validation(format!("unknown resource '{s}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scrubbing
// ─────────────────────────────────────────────────────────────────────────────

/// Keys removed from snapshots, compared case-insensitively with `_` ignored
/// so `password_hash` and `passwordHash` are both caught.
const SECRET_KEYS: &[&str] = &[
    "password",
    "passwordhash",
    "passwordresettoken",
    "passwordresetexpires",
    "accesstoken",
    "refreshtoken",
    "token",
    "tokens",
    "secret",
];

fn is_secret_key(key: &str) -> bool {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    SECRET_KEYS.contains(&folded.as_str())
}

/// Remove secret-bearing keys at any depth.
pub fn scrub_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_secret_key(key));
            map.values_mut().for_each(scrub_secrets);
        }
        Value::Array(items) => items.iter_mut().for_each(scrub_secrets),
        _ => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    /// Acting principal; `None` for anonymous events such as failed logins.
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub resource: ResourceKind,
    pub resource_id: Option<String>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, resource: ResourceKind) -> Self {
        Self {
            id: AuditId::new(),
            user_id: None,
            action,
            resource,
            resource_id: None,
            before: None,
            after: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn actor(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn resource_id(mut self, id: Option<String>) -> Self {
        self.resource_id = id;
        self
    }

    pub fn before(mut self, mut snapshot: Value) -> Self {
        scrub_secrets(&mut snapshot);
        self.before = Some(snapshot);
        self
    }

    pub fn after(mut self, mut snapshot: Value) -> Self {
        scrub_secrets(&mut snapshot);
        self.after = Some(snapshot);
        self
    }

    pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Query over the audit log. Every set field must match; time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub resource: Option<ResourceKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.user_id.is_none_or(|id| record.user_id == Some(id))
            && self.action.is_none_or(|a| record.action == a)
            && self.resource.is_none_or(|r| record.resource == r)
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn action_wire_tags() {
        assert_eq!(serde_json::to_value(AuditAction::LoginFailed).unwrap(), json!("LOGIN_FAILED"));
        assert_eq!(serde_json::to_value(AuditAction::PasswordChange).unwrap(), json!("PASSWORD_CHANGE"));
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
            assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
        }
        assert_eq!("login".parse::<AuditAction>().unwrap(), AuditAction::Login);
        assert!("LOGIN_SUCCEEDED".parse::<AuditAction>().is_err());
    }

    #[test]
    fn resource_wire_tags() {
        assert_eq!(serde_json::to_value(ResourceKind::Auth).unwrap(), json!("auth"));
        assert_eq!("ROLE".parse::<ResourceKind>().unwrap(), ResourceKind::Role);
        assert!("tenant".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn scrub_removes_secrets_at_any_depth() {
        let mut value = json!({
            "id": "u1",
            "email": "a@example.com",
            "password_hash": "$2b$...",
            "passwordResetToken": "abc",
            "tokens": {"access_token": "x", "refresh_token": "y"},
            "user": {"id": "u1", "password": "plain", "profile": {"secret": 1, "bio": "hi"}},
            "history": [{"token": "t", "at": 1}]
        });
        scrub_secrets(&mut value);
        assert_eq!(
            value,
            json!({
                "id": "u1",
                "email": "a@example.com",
                "user": {"id": "u1", "profile": {"bio": "hi"}},
                "history": [{"at": 1}]
            })
        );
    }

    #[test]
    fn builder_scrubs_snapshots() {
        let record = AuditRecord::new(AuditAction::Update, ResourceKind::User)
            .before(json!({"email": "old@example.com", "password_hash": "h"}))
            .after(json!({"email": "new@example.com", "password_reset_expires": "2030-01-01"}));
        assert_eq!(record.before, Some(json!({"email": "old@example.com"})));
        assert_eq!(record.after, Some(json!({"email": "new@example.com"})));
        assert_eq!(record.user_id, None);
    }

    #[test]
    fn filter_matches_all_set_fields() {
        let actor = UserId::new();
        let record = AuditRecord::new(AuditAction::Login, ResourceKind::Auth).actor(Some(actor));
        let at = record.created_at;

        assert!(AuditFilter::default().matches(&record));
        assert!(AuditFilter {
            user_id: Some(actor),
            action: Some(AuditAction::Login),
            resource: Some(ResourceKind::Auth),
            from: Some(at),
            to: Some(at),
        }
        .matches(&record));
        assert!(!AuditFilter {
            user_id: Some(UserId::new()),
            ..Default::default()
        }
        .matches(&record));
        assert!(!AuditFilter {
            action: Some(AuditAction::Logout),
            ..Default::default()
        }
        .matches(&record));
        assert!(!AuditFilter {
            from: Some(at + Duration::seconds(1)),
            ..Default::default()
        }
        .matches(&record));
    }
}
