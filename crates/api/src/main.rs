use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use warden_api::app::{AppServices, build_app};
use warden_api::config::AppConfig;
use warden_auth::{PasswordHasher, TokenIssuer};
use warden_infra::store::postgres;
use warden_infra::{LogResetNotifier, RetentionWorker, Stores};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = AppConfig::from_env()?;

    let stores = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url).await?;
            postgres::migrate(&pool).await?;
            tracing::info!("using postgres stores");
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
            Stores::in_memory()
        }
    };

    let issuer = TokenIssuer::new(config.tokens.clone()).context("invalid token configuration")?;
    let services = Arc::new(AppServices::new(
        &stores,
        issuer,
        PasswordHasher::new(config.bcrypt_cost),
        Arc::new(LogResetNotifier),
    ));
    services
        .seed(config.bootstrap_admin.as_ref())
        .await
        .context("failed to seed roles")?;

    let retention = RetentionWorker::spawn(services.audit_writer.clone(), config.retention);

    let app = build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("server error")?;

    retention.shutdown().await;
    Ok(())
}
