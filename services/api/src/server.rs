use crate::cli::{ScanArgs, ServeArgs};
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use shepherd::api::{cors_layer, with_rate_limit, RateLimiter};
use shepherd::auth::JwtKeys;
use shepherd::config::{AppConfig, ConfigError};
use shepherd::error::AppError;
use shepherd::notifications::ConfiguredMailer;
use shepherd::scheduler::Scheduler;
use shepherd::store::{MemoryStore, PgStore, Store};
use shepherd::{church_router, telemetry, ChurchApi};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.no_scheduler {
        config.scheduler.enabled = false;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    match open_database(&config).await? {
        Some(store) => serve(config, Arc::new(store.clone()), Some(store)).await,
        None => {
            tracing::warn!("DATABASE_URL not set; data is kept in memory and lost on restart");
            serve(config, Arc::new(MemoryStore::new()), None).await
        }
    }
}

pub(crate) async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    if config.database.url.is_none() {
        return Err(ConfigError::MissingDatabaseUrl.into());
    }
    open_database(&config).await?;
    info!("database migrations applied");
    Ok(())
}

pub(crate) async fn scan(args: ScanArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    match open_database(&config).await? {
        Some(store) => run_job(config, Arc::new(store), args).await,
        None => {
            tracing::warn!("DATABASE_URL not set; scanning an empty in-memory store");
            run_job(config, Arc::new(MemoryStore::new()), args).await
        }
    }
}

/// Connect and migrate when a database is configured.
async fn open_database(config: &AppConfig) -> Result<Option<PgStore>, AppError> {
    let Some(url) = config.database.url.as_deref() else {
        return Ok(None);
    };

    let store = PgStore::connect(url, config.database.max_connections).await?;
    store.migrate().await?;
    Ok(Some(store))
}

fn build_api<S: Store>(config: &AppConfig, store: Arc<S>) -> Result<ChurchApi<S, ConfiguredMailer>, AppError> {
    let mailer = Arc::new(ConfiguredMailer::from_config(&config.email)?);
    Ok(ChurchApi::new(
        store,
        mailer,
        JwtKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours),
        &config.church,
        config.notifications,
    ))
}

async fn run_job<S: Store>(config: AppConfig, store: Arc<S>, args: ScanArgs) -> Result<(), AppError> {
    let api = build_api(&config, store)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let report = api.jobs.run(args.job, today).await?;

    let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

async fn serve<S: Store>(config: AppConfig, store: Arc<S>, database: Option<PgStore>) -> Result<(), AppError> {
    let api = build_api(&config, store)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        database,
    };

    let shutdown = CancellationToken::new();
    let scheduler_handles = if config.scheduler.enabled {
        Scheduler::new(api.jobs.clone(), shutdown.clone()).spawn()
    } else {
        info!("scheduler disabled");
        Vec::new()
    };

    let limiter = RateLimiter::new(&config.rate_limit);
    let cleanup = spawn_rate_limit_cleanup(limiter.clone(), shutdown.clone());

    let app = with_operational_routes(with_rate_limit(church_router(api), limiter))
        .layer(Extension(app_state))
        .layer(cors_layer(&config.cors))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, church = %config.church.name, "shepherd ready");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    for handle in scheduler_handles.into_iter().chain(std::iter::once(cleanup)) {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "background task ended abnormally");
        }
    }
    info!("shutdown complete");
    Ok(())
}

/// Forget idle clients once per window so the table tracks only recent callers.
fn spawn_rate_limit_cleanup(
    limiter: RateLimiter,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = limiter.window().max(std::time::Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => limiter.cleanup().await,
            }
        }
    })
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => {}
    }
    info!("shutdown signal received");
}
