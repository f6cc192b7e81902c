//! Wiring from a validated [`AppConfig`] to the two entry points.
//!
//! - [`run_daemon`]: the long-running probe loop
//! - [`render_history`]: one-shot render of the full stored history

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::AppConfig;
use crate::forward::SenderForwarder;
use crate::probe::{IcmpProbe, Probe};
use crate::render::{GraphRenderer, RenderError, RenderSummary};
use crate::scheduler::{RunSummary, Scheduler};
use crate::storage::{PingStore, StorageError};
use crate::window::RollingWindow;

/// Errors that stop a command.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Renderer configured from the `graph` section.
pub fn graph_renderer(config: &AppConfig) -> GraphRenderer {
    GraphRenderer::new(&config.graph.output).with_bucket(config.graph.bucket)
}

/// Open the store, seed the window and assemble a scheduler for `probe`.
///
/// The window is seeded with every sample newer than `now - window_days`.
pub async fn build_scheduler<P: Probe>(
    config: &AppConfig,
    probe: P,
    now: DateTime<Utc>,
) -> Result<Scheduler<P>, DaemonError> {
    let mut store = PingStore::open(&config.storage.path).await?;

    let empty = RollingWindow::with_days(config.graph.window_days);
    let seed = store.query_range(empty.cutoff(now)).await?;
    let stored = store.count().await?;
    tracing::info!(
        path = %config.storage.path.display(),
        stored,
        seeded = seed.len(),
        window_days = config.graph.window_days,
        "Store opened"
    );

    let window = RollingWindow::from_samples(empty.span(), seed);
    let mut scheduler = Scheduler::new(probe, store, window, config.probe.interval())
        .with_renderer(graph_renderer(config));

    match &config.forward {
        Some(forward) => {
            tracing::info!(
                collector = %forward.collector_address,
                port = forward.collector_port,
                target = %forward.target_id,
                key = %forward.metric_key,
                "Forwarding enabled"
            );
            scheduler = scheduler.with_forwarder(Arc::new(SenderForwarder::new(forward.clone())));
        }
        None => tracing::debug!("Forwarding disabled"),
    }

    Ok(scheduler)
}

/// Run the probe loop against the configured host until `shutdown` resolves.
pub async fn run_daemon<F>(config: &AppConfig, shutdown: F) -> Result<RunSummary, DaemonError>
where
    F: Future<Output = ()>,
{
    let probe = IcmpProbe::new(&config.probe.host).with_timeout(config.probe.timeout);
    let scheduler = build_scheduler(config, probe, Utc::now()).await?;
    Ok(scheduler.run(shutdown).await?)
}

/// Render the full stored history once, without writing to the store.
///
/// A database file that does not exist yet renders as an empty graph.
pub async fn render_history(config: &AppConfig) -> Result<RenderSummary, DaemonError> {
    let path = &config.storage.path;
    let samples = if path.exists() {
        let mut store = PingStore::open_read_only(path).await?;
        let samples = store.query_all().await?;
        store.close().await?;
        samples
    } else {
        tracing::warn!(path = %path.display(), "Database not found, rendering empty graph");
        Vec::new()
    };

    let summary = graph_renderer(config).render(&samples)?;
    tracing::info!(
        path = %summary.path.display(),
        samples = summary.samples,
        buckets = summary.buckets,
        "Graph written"
    );
    Ok(summary)
}
