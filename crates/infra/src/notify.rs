//! Delivery of password-reset tokens.
//!
//! There is no mail transport here. [`LogResetNotifier`] only records that a
//! reset was issued (never the token itself); [`RecordingResetNotifier`]
//! keeps tokens in memory for tests and local tooling.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use warden_auth::{AuthError, AuthResult, UserProfile};

#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, user: &UserProfile, token: &str) -> AuthResult<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogResetNotifier;

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, user: &UserProfile, _token: &str) -> AuthResult<()> {
        info!(user_id = %user.id, email = %user.email, "password reset issued");
        Ok(())
    }
}

/// Keeps every `(email, token)` pair it is handed.
#[derive(Debug, Default)]
pub struct RecordingResetNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingResetNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent token sent to `email`.
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        sent.iter().rev().find(|(to, _)| to == email).map(|(_, token)| token.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ResetNotifier for RecordingResetNotifier {
    async fn send_reset(&self, user: &UserProfile, token: &str) -> AuthResult<()> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AuthError::internal("reset notifier lock poisoned"))?;
        sent.push((user.email.clone(), token.to_string()));
        Ok(())
    }
}
