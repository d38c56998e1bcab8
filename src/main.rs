//! Subscription outbox relay
//!
//! Publishes committed subscription events from the PostgreSQL outbox to
//! Redis Streams until Ctrl-C or SIGTERM.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use subscription_service::adapters::events::OutboxRelay;
use subscription_service::adapters::postgres::{self, PostgresOutboxStore};
use subscription_service::adapters::redis::RedisStreamBus;
use subscription_service::config::{AppConfig, LogFormat, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.telemetry)?;
    config.validate()?;

    let relay_config = config.relay.to_relay_config();
    tracing::info!(
        instance_id = %relay_config.instance_id,
        poll_interval_ms = config.relay.poll_interval_ms,
        publish_timeout_ms = config.relay.publish_timeout_ms,
        "Starting subscription outbox relay"
    );

    let pool = postgres::connect_pool(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let bus = RedisStreamBus::connect(&config.redis).await?;
    tracing::info!("Connected to Redis");

    let relay = OutboxRelay::with_config(
        Arc::new(PostgresOutboxStore::new(pool.clone())),
        Arc::new(bus),
        relay_config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay_task = tokio::spawn(async move { relay.run(shutdown_rx).await });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    match relay_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Relay stopped with an error"),
        Err(e) => tracing::error!(error = %e, "Relay task ended abnormally"),
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(telemetry: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = telemetry.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    match telemetry.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping relay");
}
