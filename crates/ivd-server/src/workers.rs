//! Background workers: cooperative `tokio::spawn` ticks for the LIS pull
//! (retrieval) and push (upload) loops, cancelled via a shared
//! `CancellationToken` on shutdown. Every tick catches its own errors —
//! nothing propagates out of the spawned task.

use std::sync::Arc;
use std::time::Duration;

use ivd_domain::Id;
use ivd_lis::LisIntegrationService;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub fn spawn_lis_pull_worker(
    tenant_id: Id,
    pull_interval: Duration,
    service: Arc<LisIntegrationService>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(pull_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(tenant_id = %tenant_id, "LIS pull worker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    match service.retrieve(&tenant_id).await {
                        Ok(outcome) => info!(
                            tenant_id = %tenant_id,
                            samples_ingested = outcome.samples_ingested,
                            results_ingested = outcome.results_ingested,
                            "LIS pull tick complete"
                        ),
                        Err(err) => error!(tenant_id = %tenant_id, error = %err, "LIS pull tick failed"),
                    }
                }
            }
        }
    })
}

pub fn spawn_lis_upload_worker(
    tenant_id: Id,
    upload_interval: Duration,
    service: Arc<LisIntegrationService>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(upload_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(tenant_id = %tenant_id, "LIS upload worker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    match service.upload_eligible(&tenant_id).await {
                        Ok(outcome) => info!(
                            tenant_id = %tenant_id,
                            total_sent = outcome.total_sent,
                            total_failed = outcome.total_failed,
                            "LIS upload tick complete"
                        ),
                        Err(err) => error!(tenant_id = %tenant_id, error = %err, "LIS upload tick failed"),
                    }
                }
            }
        }
    })
}
