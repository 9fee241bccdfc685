//! IVD middleware server entrypoint: loads configuration, builds the
//! process-lifetime `AppContext`, spawns the LIS background workers and
//! serves the HTTP API until shutdown is requested.

mod app_context;
mod workers;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use clap::Parser;
use ivd_config::ConfigLoader;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use app_context::AppContext;

/// CLI overrides for the listen address; every other setting comes from the
/// environment per the configuration loader.
#[derive(Parser)]
#[command(name = "ivd-server", about = "IVD middleware HTTP server")]
struct Args {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}

/// Tenant ids background workers poll on behalf of. Tenant provisioning is
/// out of scope for this crate, so the set is read directly from the
/// environment rather than through `ivd_config::AppConfig`.
fn bootstrap_tenant_ids() -> Vec<String> {
    std::env::var("IVD_BOOTSTRAP_TENANT_IDS")
        .ok()
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ConfigLoader::from_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(environment = %config.app.environment, host = %config.server.host, port = config.server.port, "starting ivd-server");

    let context = AppContext::build(config.clone()).await?;
    let cors = build_cors(&config.security.cors_origins);
    let app = ivd_api::build_router(context.app_state(), cors);

    let shutdown = CancellationToken::new();
    let tenant_ids = bootstrap_tenant_ids();
    if tenant_ids.is_empty() {
        warn!("IVD_BOOTSTRAP_TENANT_IDS not set; LIS background workers will not run");
    }

    let pull_interval = Duration::from_secs(60 * config.lis.default_pull_interval_minutes.max(1) as u64);
    let upload_interval = Duration::from_secs(60 * config.lis.default_pull_interval_minutes.max(1) as u64);
    let mut worker_handles = Vec::new();
    for tenant_id in &tenant_ids {
        worker_handles.push(workers::spawn_lis_pull_worker(
            tenant_id.clone(),
            pull_interval,
            context.lis_integration.clone(),
            shutdown.clone(),
        ));
        worker_handles.push(workers::spawn_lis_upload_worker(
            tenant_id.clone(),
            upload_interval,
            context.lis_integration.clone(),
            shutdown.clone(),
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let shutdown_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown_signal.cancel();
        })
        .await?;

    for handle in worker_handles {
        let _ = handle.await;
    }

    Ok(())
}
