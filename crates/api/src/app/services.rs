//! Application services shared by all handlers.

use std::sync::Arc;

use tracing::info;

use warden_auth::{AuthResult, PasswordHasher, PermissionEvaluator, RbacEvaluator, TokenIssuer};
use warden_infra::{
    AuditInterceptor, AuditLogService, AuditWriter, ResetNotifier, RoleService, SessionManager, Stores, UserService,
};

use crate::config::BootstrapAdmin;

pub struct AppServices {
    pub issuer: Arc<TokenIssuer>,
    pub evaluator: Arc<dyn PermissionEvaluator>,
    pub sessions: SessionManager,
    pub users: UserService,
    pub roles: RoleService,
    pub audit_log: AuditLogService,
    pub interceptor: AuditInterceptor,
    pub audit_writer: AuditWriter,
}

impl AppServices {
    pub fn new(
        stores: &Stores,
        issuer: TokenIssuer,
        hasher: PasswordHasher,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let issuer = Arc::new(issuer);
        let audit_writer = AuditWriter::new(stores.audit.clone());

        Self {
            sessions: SessionManager::new(
                stores.users.clone(),
                stores.roles.clone(),
                issuer.clone(),
                hasher,
                audit_writer.clone(),
                notifier,
            ),
            users: UserService::new(stores.users.clone(), stores.roles.clone(), hasher),
            roles: RoleService::new(stores.roles.clone(), stores.users.clone()),
            audit_log: AuditLogService::new(stores.audit.clone()),
            interceptor: AuditInterceptor::new(audit_writer.clone()),
            evaluator: Arc::new(RbacEvaluator),
            audit_writer,
            issuer,
        }
    }

    /// Seed built-in roles and, when configured, the bootstrap administrator.
    pub async fn seed(&self, admin: Option<&BootstrapAdmin>) -> AuthResult<()> {
        self.roles.ensure_builtin_roles().await?;
        if let Some(admin) = admin {
            if let Some(profile) = self.users.bootstrap_admin(&admin.email, admin.password.clone()).await? {
                info!(user_id = %profile.id, email = %profile.email, "bootstrap administrator ready");
            }
        }
        Ok(())
    }
}
