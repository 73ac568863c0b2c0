use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use shared::broker::{self, ORDER_PAID_EVENT, RetryPolicy, run_consumer};
use shared::discovery::{self, run_health_checks};
use shared::rpc::STOCK_SERVICE;
use shared::tasks::{BackgroundTasks, TaskKind};
use shared::telemetry::{LogOptions, init_logger};
use stock_service::config::{Config, ProcessorConfig};
use stock_service::consumer::OrderPaidProcessor;
use stock_service::gateway::RpcOrderGateway;
use stock_service::handler::rpc_router;
use stock_service::http::catalog_router;
use stock_service::processor::{MemoryStockProcessor, StockProcessor, StripeStockProcessor};
use stock_service::store::MemoryStockStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let telemetry = init_logger("stock-service", &LogOptions::from_env());

    let config = Config::from_env()?;

    let processor: Arc<dyn StockProcessor> = match &config.processor {
        ProcessorConfig::Memory => Arc::new(MemoryStockProcessor::new()),
        ProcessorConfig::Stripe { secret_key } => Arc::new(StripeStockProcessor::new(secret_key)?),
    };

    let registry = discovery::from_config(&config.registry)?;
    let instance_id = discovery::generate_instance_id(STOCK_SERVICE);
    registry
        .register(&instance_id, STOCK_SERVICE, &config.rpc_addr)
        .await
        .context("failed to register with the service registry")?;

    let broker = broker::connect(&config.broker)
        .await
        .context("failed to connect to the message broker")?;
    let paid_queue = broker.bind_fanout(ORDER_PAID_EVENT).await?;
    let deliveries = broker.consume(&paid_queue).await?;

    let service = stock_service::build_service(
        Arc::new(MemoryStockStore::new()),
        processor,
        Arc::new(RpcOrderGateway::new(registry.clone())),
    );

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();
    tasks.spawn(
        "registry_heartbeat",
        TaskKind::Heartbeat,
        run_health_checks(
            registry.clone(),
            instance_id.clone(),
            STOCK_SERVICE.to_string(),
            config.registry.health_interval,
            shutdown.clone(),
        ),
    );
    tasks.spawn(
        "order_paid_consumer",
        TaskKind::Consumer,
        run_consumer(
            broker.clone(),
            deliveries,
            Arc::new(OrderPaidProcessor::new(service.clone())),
            RetryPolicy::default(),
            shutdown.clone(),
        ),
    );

    let rpc_listener = tokio::net::TcpListener::bind(&config.rpc_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.rpc_addr))?;
    let http_listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!(
        rpc_addr = %config.rpc_addr,
        http_addr = %config.http_addr,
        instance_id = %instance_id,
        "stock service listening"
    );

    let rpc_app = rpc_router(service.clone());
    let rpc_shutdown = shutdown.clone();
    tasks.spawn("rpc_server", TaskKind::Server, async move {
        let serve = axum::serve(rpc_listener, rpc_app)
            .with_graceful_shutdown(async move { rpc_shutdown.cancelled().await });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "rpc server error");
        }
    });

    let http_app = catalog_router(service);
    tasks.spawn("http_server", TaskKind::Server, async move {
        let serve = axum::serve(http_listener, http_app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "http server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    tasks.shutdown(Duration::from_secs(10)).await;
    if let Err(e) = registry.deregister(&instance_id, STOCK_SERVICE).await {
        tracing::warn!(error = %e, "failed to deregister");
    }
    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "failed to close broker");
    }
    telemetry.shutdown();
    Ok(())
}
