//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Duration as ChronoDuration;
use tracing::warn;

use warden_auth::{PasswordHasher, TokenConfig};
use warden_infra::RetentionConfig;

const DEV_ACCESS_SECRET: &str = "dev-insecure-access-secret";
const DEV_REFRESH_SECRET: &str = "dev-insecure-refresh-secret";

/// Administrator account created at startup when both variables are set.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub tokens: TokenConfig,
    pub bcrypt_cost: u32,
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub retention: RetentionConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or(&var, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let access_secret = var("JWT_ACCESS_SECRET").unwrap_or_else(|| {
            warn!("JWT_ACCESS_SECRET not set; using insecure dev default");
            DEV_ACCESS_SECRET.to_string()
        });
        let refresh_secret = var("JWT_REFRESH_SECRET").unwrap_or_else(|| {
            warn!("JWT_REFRESH_SECRET not set; using insecure dev default");
            DEV_REFRESH_SECRET.to_string()
        });
        if access_secret == refresh_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let mut tokens = TokenConfig::new(access_secret, refresh_secret);
        tokens.access_ttl = ttl_or(&var, "ACCESS_TOKEN_TTL_MINUTES", 15, ChronoDuration::try_minutes)?;
        tokens.refresh_ttl = ttl_or(&var, "REFRESH_TOKEN_TTL_DAYS", 7, ChronoDuration::try_days)?;
        tokens.reset_ttl = ttl_or(&var, "PASSWORD_RESET_TTL_MINUTES", 60, ChronoDuration::try_minutes)?;

        let bcrypt_cost = parse_or(&var, "BCRYPT_COST", PasswordHasher::default().cost())?;

        let retention = RetentionConfig {
            retention_days: parse_or(&var, "AUDIT_RETENTION_DAYS", 90u32)?,
            interval: Duration::from_secs(60 * 60),
        };

        let bootstrap_admin = match (var("BOOTSTRAP_ADMIN_EMAIL"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => {
                warn!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must both be set; skipping bootstrap admin");
                None
            }
        };

        Ok(Self {
            bind_addr,
            tokens,
            bcrypt_cost,
            database_url: var("DATABASE_URL"),
            retention,
            bootstrap_admin,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

/// A positive token lifetime in the unit `to_duration` converts from.
fn ttl_or(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
    to_duration: fn(i64) -> Option<ChronoDuration>,
) -> anyhow::Result<ChronoDuration> {
    let amount = parse_or(var, key, default)?;
    if amount <= 0 {
        bail!("invalid {key}: must be positive, got {amount}");
    }
    to_duration(amount).with_context(|| format!("invalid {key}: {amount} is out of range"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.tokens.access_ttl, ChronoDuration::minutes(15));
        assert_eq!(cfg.tokens.refresh_ttl, ChronoDuration::days(7));
        assert_eq!(cfg.tokens.reset_ttl, ChronoDuration::hours(1));
        assert_eq!(cfg.retention.retention_days, 90);
        assert!(cfg.database_url.is_none());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("ACCESS_TOKEN_TTL_MINUTES", "5"),
            ("AUDIT_RETENTION_DAYS", "30"),
            ("BCRYPT_COST", "6"),
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "root-password"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.tokens.access_ttl, ChronoDuration::minutes(5));
        assert_eq!(cfg.retention.retention_days, 30);
        assert_eq!(cfg.bcrypt_cost, 6);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/warden"));
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "root@example.com");
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let err = config(&[("REFRESH_TOKEN_TTL_DAYS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_TTL_DAYS"));
    }

    #[test]
    fn token_lifetimes_must_be_positive_and_in_range() {
        for (key, raw) in [
            ("ACCESS_TOKEN_TTL_MINUTES", "0"),
            ("REFRESH_TOKEN_TTL_DAYS", "-3"),
            ("PASSWORD_RESET_TTL_MINUTES", "9223372036854775807"),
            ("REFRESH_TOKEN_TTL_DAYS", "9223372036854775807"),
        ] {
            let err = config(&[(key, raw)]).unwrap_err();
            assert!(err.to_string().contains(key), "{key}={raw}: {err}");
        }

        let cfg = config(&[("REFRESH_TOKEN_TTL_DAYS", "30"), ("PASSWORD_RESET_TTL_MINUTES", "1")]).unwrap();
        assert_eq!(cfg.tokens.refresh_ttl, ChronoDuration::days(30));
        assert_eq!(cfg.tokens.reset_ttl, ChronoDuration::minutes(1));
    }

    #[test]
    fn shared_secrets_are_refused() {
        assert!(config(&[("JWT_ACCESS_SECRET", "same"), ("JWT_REFRESH_SECRET", "same")]).is_err());
    }

    #[test]
    fn debug_output_hides_admin_password() {
        let cfg = config(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "root-password"),
        ])
        .unwrap();
        assert!(!format!("{cfg:?}").contains("root-password"));
    }
}
