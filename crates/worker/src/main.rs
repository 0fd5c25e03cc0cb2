use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beacon_core::job::NOTIFY_JOB_NAME;
use beacon_events::{EventBus, RedisNotificationStore, RedisPubSub};
use beacon_worker::config::WorkerConfig;
use beacon_worker::handlers::NotifyHandler;
use beacon_worker::registry::JobRegistry;
use beacon_worker::retention;
use beacon_worker::runner::JobRunner;
use beacon_worker::store::PgJobStore;
use beacon_worker::worker::JobWorker;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        project = %config.project_name,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = beacon_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    beacon_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Redis ---
    let pubsub = Arc::new(
        RedisPubSub::connect(&config.redis_url, config.channels())
            .await
            .expect("Failed to connect to Redis"),
    );
    tracing::info!("Redis connection established");

    let cancel = CancellationToken::new();

    // --- Event bus (fed by the Redis listener) ---
    let event_bus = Arc::new(EventBus::default());
    let listener_handle = {
        let pubsub = Arc::clone(&pubsub);
        let bus = Arc::clone(&event_bus);
        let cancel = cancel.clone();
        tokio::spawn(async move { pubsub.run_listener(bus, cancel).await })
    };

    // --- Handlers ---
    let notifications = Arc::new(
        RedisNotificationStore::new(pubsub.connection(), config.channels())
            .with_ttl_secs(config.notification_ttl_secs),
    );
    let mut registry = JobRegistry::new();
    registry.register(
        NOTIFY_JOB_NAME,
        NotifyHandler::new(notifications, pubsub.clone()),
    );
    tracing::info!(handlers = ?registry.names(), "Job handlers registered");

    // --- Worker ---
    let store = Arc::new(PgJobStore::new(pool.clone()));
    let runner = JobRunner::new(store.clone(), Arc::new(registry), pubsub.clone());
    let worker = JobWorker::new(store, runner).with_poll_interval(config.poll_interval);

    let worker_handle = {
        let events = event_bus.subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(events, cancel).await })
    };

    // --- Retention ---
    let retention_handle = tokio::spawn(retention::run(
        pool.clone(),
        config.retention_hours,
        cancel.clone(),
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping worker");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), worker_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), listener_handle).await;

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
