//! Journey orchestrator entry point.
//!
//! Wires the stores, the pgmq bus, the orchestrator and the ingestion
//! gateway, starts one worker per inbound partition and serves the HTTP API
//! until Ctrl-C.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use journey_api::config::{JourneyConfig, SERVICE_NAME};
use journey_api::error::AppError;
use journey_api::routes;
use journey_api::state::{ApiSettings, AppState};
use journey_api::telemetry;
use journey_cache::coordination::RedisCoordinationStore;
use journey_cache::state_store::RedisStateStore;
use journey_card_application::application::action_publisher::IdempotentActionPublisher;
use journey_card_application::application::decision_engine::DecisionEngine;
use journey_card_application::application::orchestrator::Orchestrator;
use journey_card_application::domain::messages::MessageCatalog;
use journey_core::clock::{Clock, SystemClock};
use journey_event_store::pg_action_audit::PgActionAudit;
use journey_event_store::pg_event_store::PgEventStore;
use journey_ingest::gateway::IngestionGateway;
use journey_ingest::worker::spawn_partition_workers;
use journey_queue::pgmq_bus::PgmqBus;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = JourneyConfig::from_env()?;
    let telemetry = telemetry::init(&config)?;

    tracing::info!(
        partitions = config.partitions,
        locale = ?config.locale,
        required_documents = config.document_requirement.count(),
        "Starting journey orchestrator"
    );

    // Audit stores and partition queues share one pool.
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Database(e.into()))?;
    let event_store = Arc::new(PgEventStore::new(pool.clone()));
    let action_audit = Arc::new(PgActionAudit::new(pool.clone()));

    // State and coordination share one Redis.
    let redis = journey_cache::connect(&config.redis_url)
        .await
        .map_err(AppError::Cache)?;
    let state_store = Arc::new(RedisStateStore::new(
        redis.clone(),
        config.state_prefix.clone(),
        config.state_ttl,
        config.document_requirement,
    ));
    let coordination = Arc::new(RedisCoordinationStore::new(redis));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = PgmqBus::new(pool, config.queue_settings(), Arc::clone(&clock)).await;
    for topic in [
        &config.customer_events_topic,
        &config.actions_topic,
        &config.dead_letter_topic,
    ] {
        bus.ensure_topic(topic).await.map_err(AppError::Queue)?;
    }
    bus.release_in_flight(&config.customer_events_topic)
        .await
        .map_err(AppError::Queue)?;
    let bus = Arc::new(bus);

    let publisher = Arc::new(IdempotentActionPublisher::new(
        coordination,
        bus.clone(),
        action_audit.clone(),
        config.publisher_settings(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        event_store.clone(),
        state_store.clone(),
        DecisionEngine::new(
            config.document_requirement,
            MessageCatalog::new(config.locale),
        ),
        publisher,
        Arc::clone(&clock),
    ));
    let gateway = Arc::new(IngestionGateway::new(
        orchestrator,
        bus.clone(),
        config.dead_letter_topic.clone(),
        Arc::clone(&clock),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_partition_workers(
        bus.clone(),
        gateway,
        &config.worker_settings(),
        &shutdown_rx,
    );

    let app_state = AppState::new(
        event_store,
        state_store,
        action_audit,
        bus,
        clock,
        ApiSettings {
            service_name: SERVICE_NAME.to_owned(),
            customer_events_topic: config.customer_events_topic.clone(),
            dashboard_recent_limit: config.dashboard_recent_limit,
        },
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Server)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .map_err(AppError::Server)?;

    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "partition worker ended abnormally");
        }
    }
    tracing::info!("journey orchestrator stopped");
    telemetry.shutdown();

    Ok(())
}

/// Resolves on Ctrl-C and tells the partition workers to stop.
async fn shutdown_signal(workers: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::warn!("shutdown signal received");
    let _ = workers.send(true);
}
