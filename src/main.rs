// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use agentpool_provisioner::{
    cloud::{arm::ArmClient, AgentPoolClient},
    cluster::{install_crypto_provider, ClusterClient, KubeClusterClient},
    config::Config,
    constants::TOKIO_WORKER_THREADS,
    instance::new_instance_provider,
    reconcilers::{nodeclaim_status, GarbageCollector},
    server::{self, Readiness},
};
use anyhow::Result;
use clap::Parser;
use kube::Client;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = Config::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("agentpool-provisioner")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let scope = config.scope();
    info!(
        subscription = %scope.subscription_id,
        resource_group = %scope.resource_group,
        cluster = %scope.cluster_name,
        variant = %scope.variant,
        "Starting agent pool provisioner"
    );

    install_crypto_provider();

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let cluster: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::new(client.clone()));

    debug!(endpoint = %config.arm_endpoint, "Initializing agent pool client");
    let agent_pools: Arc<dyn AgentPoolClient> = Arc::new(ArmClient::new(
        &config.arm_endpoint,
        scope.clone(),
        config.credential()?,
        config.poll_settings(),
    )?);

    let provider = new_instance_provider(scope, agent_pools, cluster.clone());
    let garbage_collector = GarbageCollector::new(provider, cluster.clone());

    let readiness = Readiness::new();
    let listener = tokio::net::TcpListener::bind(config.metrics_addr()?).await?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut metrics_server = tokio::spawn(server::serve(listener, readiness.clone(), async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    }));

    info!("Starting all controllers");
    readiness.set_ready();

    // Controllers should never exit - if one fails, we log it and exit the main process
    tokio::select! {
        result = garbage_collector.run(config.gc_interval()) => {
            error!("CRITICAL: GarbageCollection controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("GarbageCollection controller exited unexpectedly without error")
        }
        result = nodeclaim_status::run(client, cluster) => {
            error!("CRITICAL: NodeClaimStatus controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("NodeClaimStatus controller exited unexpectedly without error")
        }
        result = &mut metrics_server => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result??;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Stopping all controllers");
        }
    }

    let _ = shutdown_tx.send(true);
    metrics_server.await??;
    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGTERM (pod termination) or Ctrl+C.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM (pod termination), initiating graceful shutdown"),
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating graceful shutdown");
    }
    Ok(())
}
