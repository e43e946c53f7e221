use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use nsgate::cli::Args;
use nsgate::config::{self, GatewayConfig};
use nsgate::gateway::{ClusterGateway, InMemoryGateway, KubeGateway};
use nsgate::namespaces::NamespaceService;
use nsgate::server::{
    create_router, run_until_shutdown, shutdown_signal, spawn_warmup, AppState, Readiness,
};
use nsgate::telemetry::{init_logging, install_panic_hook, HttpMetrics, UPKEEP_INTERVAL};

#[tokio::main]
async fn main() {
    // Before parsing so .env can feed NSGATE_* variables
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(args.verbose);
    install_panic_hook();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.apply(config::load_or_default(args.config.as_deref())?);
    config::validate(&config).context("Invalid configuration")?;

    let gateway = build_gateway(&config);
    let namespaces = NamespaceService::new(gateway).with_call_timeout(config.gateway_timeout());
    let metrics = HttpMetrics::new().context("Failed to build metrics recorder")?;
    let readiness = Readiness::new();

    let state = AppState::new(namespaces, readiness.clone(), metrics.clone())
        .with_conflict_status(config.conflict_status());
    let app = create_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);
    info!("Endpoints:");
    info!("  GET  /namespaces         - List namespaces with their pods");
    info!("  GET  /namespaces/{{name}}  - Get one namespace");
    info!("  POST /namespaces         - Create a namespace");
    info!("  GET  /healthz            - Liveness probe");
    info!("  GET  /readyz             - Readiness probe");
    info!("  GET  /metrics            - Prometheus metrics");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let warmup = spawn_warmup(readiness, config.warmup(), shutdown_rx.clone());
    let upkeep = metrics.spawn_upkeep(UPKEEP_INTERVAL, shutdown_rx);

    let signal = shutdown_signal().context("Failed to install signal handlers")?;
    let result = run_until_shutdown(listener, app, signal, shutdown_tx, config.shutdown_grace()).await;

    // Both tasks watch the shutdown channel, which is flipped on every exit path
    let _ = tokio::join!(warmup, upkeep);

    result.map_err(Into::into)
}

fn build_gateway(config: &GatewayConfig) -> Arc<dyn ClusterGateway> {
    if config.in_memory {
        info!("Using in-memory cluster");
        return Arc::new(InMemoryGateway::with_defaults());
    }

    match &config.kubeconfig {
        Some(path) => {
            info!("Using kubeconfig {}", path.display());
            Arc::new(KubeGateway::from_kubeconfig(path.clone()))
        }
        None => Arc::new(KubeGateway::infer()),
    }
}
