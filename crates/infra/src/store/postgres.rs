//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / Io / other | n/a | `Backend` |
//!
//! Permissions are stored as `TEXT[]`, audit snapshots as `JSONB`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use warden_auth::{AuditAction, AuditFilter, AuditRecord, PermissionSet, ResourceKind, Role, User};
use warden_core::{AuditId, Page, Pagination, RoleId, UserId};

use super::{AuditStore, RoleStore, StoreError, StoreResult, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        permissions TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS roles_name_key ON roles (name)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        last_login TIMESTAMPTZ,
        phone TEXT,
        bio TEXT,
        avatar_url TEXT,
        role_id UUID NOT NULL,
        password_reset_token TEXT,
        password_reset_expires TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)",
    "CREATE INDEX IF NOT EXISTS users_role_id_idx ON users (role_id)",
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        id UUID PRIMARY KEY,
        user_id UUID,
        action TEXT NOT NULL,
        resource TEXT NOT NULL,
        resource_id TEXT,
        before JSONB,
        after JSONB,
        ip_address TEXT,
        user_agent TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS audit_logs_created_at_idx ON audit_logs (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS audit_logs_user_id_idx ON audit_logs (user_id)",
];

/// Open a connection pool.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to postgres")
}

/// Create tables and indexes if they do not exist.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("migration statement failed: {}", statement.trim()))?;
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_error(operation: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {operation}: {err}"))
}

fn page_bounds(pagination: Pagination) -> (i64, i64) {
    (pagination.limit as i64, pagination.offset() as i64)
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, is_active, last_login, \
     phone, bio, avatar_url, role_id, password_reset_token, password_reset_expires, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        last_login: row.try_get("last_login")?,
        phone: row.try_get("phone")?,
        bio: row.try_get("bio")?,
        avatar_url: row.try_get("avatar_url")?,
        role_id: RoleId::from_uuid(row.try_get("role_id")?),
        password_reset_token: row.try_get("password_reset_token")?,
        password_reset_expires: row.try_get("password_reset_expires")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decode the row an `UPDATE .. RETURNING` produced, if any.
fn returned_user(operation: &str, row: Option<PgRow>) -> StoreResult<Option<User>> {
    row.map(|r| user_from_row(&r))
        .transpose()
        .map_err(|e| decode_error(operation, e))
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, password_hash, is_active, last_login,
                phone, bio, avatar_url, role_id, password_reset_token, password_reset_expires,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.role_id.as_uuid())
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.map(|r| user_from_row(&r))
            .transpose()
            .map_err(|e| decode_error("get_user", e))
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| user_from_row(&r))
            .transpose()
            .map_err(|e| decode_error("find_user_by_email", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_profile(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                first_name = $2, last_name = $3, email = $4, phone = $5, bio = $6, avatar_url = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user_profile", e))?;
        returned_user("update_user_profile", row)?.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE users SET last_login = $2, updated_at = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_login", e))?;
        returned_user("record_login", row)?.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_active(&self, id: UserId, active: bool, at: DateTime<Utc>) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(active)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_active", e))?;
        returned_user("set_user_active", row)?.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self), fields(user_id = %id, role_id = %role_id), err)]
    async fn set_role(&self, id: UserId, role_id: RoleId, at: DateTime<Utc>) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role_id = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_role", e))?;
        returned_user("set_user_role", row)?.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self, token), fields(user_id = %id), err)]
    async fn set_reset_token(
        &self,
        id: UserId,
        token: String,
        expires: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET password_reset_token = $2, password_reset_expires = $3, updated_at = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(token)
        .bind(expires)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_reset_token", e))?;
        returned_user("set_reset_token", row)?.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self, expected, hash), fields(user_id = %id), err)]
    async fn replace_password_hash(
        &self,
        id: UserId,
        expected: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET password_hash = $3, updated_at = $4
            WHERE id = $1 AND password_hash = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(expected)
        .bind(hash)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_password_hash", e))?;
        returned_user("replace_password_hash", row)
    }

    #[instrument(skip(self, token, hash), fields(user_id = %id), err)]
    async fn redeem_reset_token(
        &self,
        id: UserId,
        token: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                password_hash = $3, password_reset_token = NULL, password_reset_expires = NULL,
                updated_at = $4
            WHERE id = $1 AND password_reset_token = $2 AND password_reset_expires > $4
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(token)
        .bind(hash)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("redeem_reset_token", e))?;
        returned_user("redeem_reset_token", row)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list(&self, pagination: Pagination) -> StoreResult<Page<User>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?
            .try_get("total")
            .map_err(|e| decode_error("count_users", e))?;

        let (limit, offset) = page_bounds(pagination);
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_error("list_users", e))?;
        Ok(Page::new(users, total as u64, pagination))
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn count_with_role(&self, role_id: RoleId) -> StoreResult<u64> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users_with_role", e))?
            .try_get("total")
            .map_err(|e| decode_error("count_users_with_role", e))?;
        Ok(total as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

const ROLE_COLUMNS: &str = "id, name, description, permissions, created_at, updated_at";

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    let permissions: Vec<String> = row.try_get("permissions")?;
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        permissions: PermissionSet::parse_lenient(permissions),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresRoleStore {
    pool: Arc<PgPool>,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    #[instrument(skip(self, role), fields(role = %role.name), err)]
    async fn insert(&self, role: Role) -> StoreResult<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.permissions.to_strings())
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(role)
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn get(&self, id: RoleId) -> StoreResult<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;
        row.map(|r| role_from_row(&r))
            .transpose()
            .map_err(|e| decode_error("get_role", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(|r| role_from_row(&r))
            .transpose()
            .map_err(|e| decode_error("find_role_by_name", e))
    }

    #[instrument(skip(self, role), fields(role_id = %role.id), err)]
    async fn update(&self, role: Role) -> StoreResult<Role> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, permissions = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.permissions.to_strings())
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role"));
        }
        Ok(role)
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn delete(&self, id: RoleId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter()
            .map(role_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_error("list_roles", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

const AUDIT_COLUMNS: &str =
    "id, user_id, action, resource, resource_id, before, after, ip_address, user_agent, created_at";

fn audit_from_row(row: &PgRow) -> Result<AuditRecord, StoreError> {
    let decode = |e: sqlx::Error| decode_error("audit_row", e);
    let action: String = row.try_get("action").map_err(decode)?;
    let resource: String = row.try_get("resource").map_err(decode)?;
    let user_id: Option<Uuid> = row.try_get("user_id").map_err(decode)?;

    Ok(AuditRecord {
        id: AuditId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: user_id.map(UserId::from_uuid),
        action: action
            .parse::<AuditAction>()
            .map_err(|e| decode_error("audit_row", e))?,
        resource: resource
            .parse::<ResourceKind>()
            .map_err(|e| decode_error("audit_row", e))?,
        resource_id: row.try_get("resource_id").map_err(decode)?,
        before: row.try_get("before").map_err(decode)?,
        after: row.try_get("after").map_err(decode)?,
        ip_address: row.try_get("ip_address").map_err(decode)?,
        user_agent: row.try_get("user_agent").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: Arc<PgPool>,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    #[instrument(skip(self, record), fields(action = %record.action, resource = %record.resource), err)]
    async fn append(&self, record: AuditRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, user_id, action, resource, resource_id, before, after,
                ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.map(|id| *id.as_uuid()))
        .bind(record.action.as_str())
        .bind(record.resource.as_str())
        .bind(&record.resource_id)
        .bind(&record.before)
        .bind(&record.after)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(record.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(audit_id = %id), err)]
    async fn get(&self, id: AuditId) -> StoreResult<Option<AuditRecord>> {
        let row = sqlx::query(&format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_audit", e))?;
        row.map(|r| audit_from_row(&r)).transpose()
    }

    #[instrument(skip(self, filter), err)]
    async fn query(&self, filter: &AuditFilter, pagination: Pagination) -> StoreResult<Page<AuditRecord>> {
        // Optional filters collapse to TRUE when unbound, keeping one parameterised query.
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR user_id = $1)
                AND ($2::text IS NULL OR action = $2)
                AND ($3::text IS NULL OR resource = $3)
                AND ($4::timestamptz IS NULL OR created_at >= $4)
                AND ($5::timestamptz IS NULL OR created_at <= $5)
        "#;
        let user_id: Option<Uuid> = filter.user_id.map(|id| *id.as_uuid());
        let action: Option<&str> = filter.action.map(|a| a.as_str());
        let resource: Option<&str> = filter.resource.map(|r| r.as_str());
        let from: Option<DateTime<Utc>> = filter.from;
        let to: Option<DateTime<Utc>> = filter.to;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM audit_logs {WHERE}"))
            .bind(user_id)
            .bind(action)
            .bind(resource)
            .bind(from)
            .bind(to)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_audit", e))?
            .try_get("total")
            .map_err(|e| decode_error("count_audit", e))?;

        let (limit, offset) = page_bounds(pagination);
        let rows = sqlx::query(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs {WHERE} ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        ))
        .bind(user_id)
        .bind(action)
        .bind(resource)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_audit", e))?;

        let records = rows.iter().map(audit_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(records, total as u64, pagination))
    }

    #[instrument(skip(self), err)]
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_audit", e))?;
        Ok(result.rows_affected())
    }
}
