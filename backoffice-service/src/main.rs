use backoffice_service::{
    build_router,
    config::{BackofficeConfig, RevocationBackend},
    services::{
        audit::spawn_retention_sweeper, spawn_revocation_sweeper, AccessAuditService, AuthService,
        InMemoryRevocationStore, MongoDb, RedisRevocationStore, RevocationStore, TokenService,
    },
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = BackofficeConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting back-office service"
    );

    tracing::info!("Initializing database connection");
    let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
    db.initialize_indexes().await?;
    tracing::info!("Database initialized successfully");

    let revocations: Arc<dyn RevocationStore> = match config.revocation.backend {
        RevocationBackend::Redis => {
            let url = config
                .revocation
                .redis_url
                .as_deref()
                .expect("validated at config load");
            Arc::new(
                RedisRevocationStore::new(url)
                    .await
                    .map_err(service_core::error::AppError::InternalError)?,
            )
        }
        RevocationBackend::Memory => Arc::new(InMemoryRevocationStore::new()),
    };
    tracing::info!(backend = ?config.revocation.backend, "Revocation store initialized");

    let tokens = TokenService::new(&config.jwt, revocations.clone())
        .map_err(service_core::error::AppError::InternalError)?;
    tracing::info!("Token service initialized");

    let audit = AccessAuditService::new(db.clone());
    let auth_service = AuthService::new(db.clone(), tokens.clone());

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    // Background maintenance owned by the process lifecycle.
    let _revocation_sweeper = spawn_revocation_sweeper(
        revocations.clone(),
        Duration::from_secs(config.revocation.sweep_interval_minutes * 60),
    );
    let _retention_sweeper = spawn_retention_sweeper(
        audit.clone(),
        config.audit.retention_days,
        Duration::from_secs(config.audit.retention_sweep_interval_hours * 3600),
    );

    let state = AppState {
        config: config.clone(),
        db,
        tokens,
        revocations,
        audit,
        auth_service,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
