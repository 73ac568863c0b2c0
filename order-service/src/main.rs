use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use order_service::config::Config;
use order_service::gateway::RpcStockGateway;
use order_service::handler::rpc_router;
use order_service::store::MemoryOrderStore;
use shared::broker::{self, ORDER_CREATED_EVENT};
use shared::discovery::{self, run_health_checks};
use shared::rpc::ORDER_SERVICE;
use shared::tasks::{BackgroundTasks, TaskKind};
use shared::telemetry::{LogOptions, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let telemetry = init_logger("order-service", &LogOptions::from_env());

    let config = Config::from_env()?;

    let registry = discovery::from_config(&config.registry)?;
    let instance_id = discovery::generate_instance_id(ORDER_SERVICE);
    registry
        .register(&instance_id, ORDER_SERVICE, &config.rpc_addr)
        .await
        .context("failed to register with the service registry")?;

    let broker = broker::connect(&config.broker)
        .await
        .context("failed to connect to the message broker")?;
    broker.declare_queue(ORDER_CREATED_EVENT).await?;

    let service = order_service::build_service(
        Arc::new(MemoryOrderStore::new()),
        Arc::new(RpcStockGateway::new(registry.clone())),
        broker.clone(),
    );

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();
    tasks.spawn(
        "registry_heartbeat",
        TaskKind::Heartbeat,
        run_health_checks(
            registry.clone(),
            instance_id.clone(),
            ORDER_SERVICE.to_string(),
            config.registry.health_interval,
            shutdown.clone(),
        ),
    );

    let listener = tokio::net::TcpListener::bind(&config.rpc_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.rpc_addr))?;
    tracing::info!(addr = %config.rpc_addr, instance_id = %instance_id, "order service listening");

    let app = rpc_router(service);
    tasks.spawn("rpc_server", TaskKind::Server, async move {
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "rpc server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    tasks.shutdown(Duration::from_secs(10)).await;
    if let Err(e) = registry.deregister(&instance_id, ORDER_SERVICE).await {
        tracing::warn!(error = %e, "failed to deregister");
    }
    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "failed to close broker");
    }
    telemetry.shutdown();
    Ok(())
}
