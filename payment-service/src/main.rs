use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use payment_service::config::{Config, ProcessorConfig};
use payment_service::consumer::OrderCreatedProcessor;
use payment_service::gateway::RpcOrderGateway;
use payment_service::processor::{
    MemoryPaymentProcessor, PaymentProcessor, StripePaymentProcessor,
};
use payment_service::webhook::{WebhookState, webhook_router};
use shared::broker::{self, ORDER_CREATED_EVENT, RetryPolicy, run_consumer};
use shared::discovery::{self, run_health_checks};
use shared::rpc::PAYMENT_SERVICE;
use shared::tasks::{BackgroundTasks, TaskKind};
use shared::telemetry::{LogOptions, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let telemetry = init_logger("payment-service", &LogOptions::from_env());

    let config = Config::from_env()?;

    let processor: Arc<dyn PaymentProcessor> = match &config.processor {
        ProcessorConfig::Memory => Arc::new(MemoryPaymentProcessor::new()),
        ProcessorConfig::Stripe { secret_key } => Arc::new(StripePaymentProcessor::new(
            secret_key,
            &config.gateway_addr,
        )?),
    };

    // Payment exposes no RPC methods; the webhook address is what it advertises
    let registry = discovery::from_config(&config.registry)?;
    let instance_id = discovery::generate_instance_id(PAYMENT_SERVICE);
    registry
        .register(&instance_id, PAYMENT_SERVICE, &config.http_addr)
        .await
        .context("failed to register with the service registry")?;

    let broker = broker::connect(&config.broker)
        .await
        .context("failed to connect to the message broker")?;
    broker.declare_queue(ORDER_CREATED_EVENT).await?;
    let deliveries = broker.consume(ORDER_CREATED_EVENT).await?;

    let service = payment_service::build_service(
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
            PAYMENT_SERVICE.to_string(),
            config.registry.health_interval,
            shutdown.clone(),
        ),
    );
    tasks.spawn(
        "order_created_consumer",
        TaskKind::Consumer,
        run_consumer(
            broker.clone(),
            deliveries,
            Arc::new(OrderCreatedProcessor::new(service)),
            RetryPolicy::default(),
            shutdown.clone(),
        ),
    );

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, instance_id = %instance_id, "payment webhook listening");

    let app = webhook_router(WebhookState::new(
        broker.clone(),
        config.endpoint_secret.as_str(),
    ));
    tasks.spawn("http_server", TaskKind::Server, async move {
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "http server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    tasks.shutdown(Duration::from_secs(10)).await;
    if let Err(e) = registry.deregister(&instance_id, PAYMENT_SERVICE).await {
        tracing::warn!(error = %e, "failed to deregister");
    }
    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "failed to close broker");
    }
    telemetry.shutdown();
    Ok(())
}
