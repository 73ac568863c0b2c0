use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use gateway::clients::RpcGateway;
use gateway::config::Config;
use gateway::handler::{AppState, router};
use shared::discovery::{self, run_health_checks};
use shared::rpc::GATEWAY_SERVICE;
use shared::tasks::{BackgroundTasks, TaskKind};
use shared::telemetry::{LogOptions, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let telemetry = init_logger("gateway", &LogOptions::from_env());

    let config = Config::from_env()?;

    let registry = discovery::from_config(&config.registry)?;
    let instance_id = discovery::generate_instance_id(GATEWAY_SERVICE);
    registry
        .register(&instance_id, GATEWAY_SERVICE, &config.http_addr)
        .await
        .context("failed to register with the service registry")?;

    let rpc = Arc::new(RpcGateway::new(registry.clone()));
    let state = AppState {
        orders: rpc.clone(),
        stocks: rpc,
        public_addr: config.public_addr.as_str().into(),
    };

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();
    tasks.spawn(
        "registry_heartbeat",
        TaskKind::Heartbeat,
        run_health_checks(
            registry.clone(),
            instance_id.clone(),
            GATEWAY_SERVICE.to_string(),
            config.registry.health_interval,
            shutdown.clone(),
        ),
    );

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, instance_id = %instance_id, "gateway listening");

    let app = router(state);
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
    if let Err(e) = registry.deregister(&instance_id, GATEWAY_SERVICE).await {
        tracing::warn!(error = %e, "failed to deregister");
    }
    telemetry.shutdown();
    Ok(())
}
