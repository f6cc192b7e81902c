//! The probe loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::forward::Forwarder;
use crate::probe::Probe;
use crate::render::GraphRenderer;
use crate::scheduler::clock::{Clock, SystemClock, next_tick};
use crate::storage::{PingStore, Sample, StorageError};
use crate::window::RollingWindow;

/// Longest pause before retrying a failed append.
pub const STORE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// The sample recorded for the tick.
    pub sample: Sample,
    /// Whether the sample reached the store.
    pub persisted: bool,
    /// Whether a send was dispatched; its outcome is only logged.
    pub dispatched: bool,
    /// Whether the graph was rewritten.
    pub rendered: bool,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub persisted: u64,
    pub probe_failures: u64,
    pub store_failures: u64,
    /// Sends dispatched to the forwarder, successful or not.
    pub dispatched: u64,
    pub render_failures: u64,
}

/// Drives the aligned probe cadence.
///
/// Owns the store connection and the rolling window for the lifetime of the
/// daemon. Each tick runs `probe -> append -> forward -> window -> render`
/// in order; only the wait for the next boundary observes shutdown.
pub struct Scheduler<P, C = SystemClock> {
    probe: P,
    clock: C,
    interval: Duration,
    store: PingStore,
    window: RollingWindow,
    renderer: Option<GraphRenderer>,
    forwarder: Option<Arc<dyn Forwarder>>,
    last_tick: Option<DateTime<Utc>>,
    summary: RunSummary,
}

impl<P, C> std::fmt::Debug for Scheduler<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("window_len", &self.window.len())
            .field("forwarding", &self.forwarder.is_some())
            .field("last_tick", &self.last_tick)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<P: Probe> Scheduler<P, SystemClock> {
    /// Create a scheduler on the system clock.
    pub fn new(probe: P, store: PingStore, window: RollingWindow, interval: Duration) -> Self {
        Self {
            probe,
            clock: SystemClock,
            interval,
            store,
            window,
            renderer: None,
            forwarder: None,
            last_tick: None,
            summary: RunSummary::default(),
        }
    }
}

impl<P: Probe, C: Clock> Scheduler<P, C> {
    /// Replace the clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Scheduler<P, C2> {
        Scheduler {
            probe: self.probe,
            clock,
            interval: self.interval,
            store: self.store,
            window: self.window,
            renderer: self.renderer,
            forwarder: self.forwarder,
            last_tick: self.last_tick,
            summary: self.summary,
        }
    }

    /// Forward present samples to `forwarder`.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Render the window after every tick.
    pub fn with_renderer(mut self, renderer: GraphRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The rolling window.
    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Counters so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Instant of the next tick.
    ///
    /// Aligned from the later of the clock and the last tick, so a timer that
    /// wakes a little early cannot fire the same boundary twice.
    pub fn next_tick(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        let from = self.last_tick.map_or(now, |last| now.max(last));
        next_tick(from, self.interval)
    }

    /// Run until `shutdown` resolves, then close the store.
    ///
    /// Shutdown is only observed while waiting for the next boundary; a tick
    /// that has started always completes its append first.
    pub async fn run<F>(mut self, shutdown: F) -> Result<RunSummary, StorageError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            host = %self.probe.target(),
            window_len = self.window.len(),
            "Scheduler started"
        );

        loop {
            let next = self.next_tick();
            tracing::trace!(next = %next, "Waiting for next tick");

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = self.clock.sleep_until(next) => {}
            }

            self.tick(next).await;
        }

        let summary = self.summary;
        self.store.close().await?;
        tracing::info!(
            ticks = summary.ticks,
            persisted = summary.persisted,
            probe_failures = summary.probe_failures,
            store_failures = summary.store_failures,
            "Scheduler stopped"
        );
        Ok(summary)
    }

    /// Run one tick for the boundary `at`.
    ///
    /// Never fails: probe, store, forward and render errors are logged and
    /// reflected in the report.
    pub async fn tick(&mut self, at: DateTime<Utc>) -> TickReport {
        self.last_tick = Some(at);
        self.summary.ticks += 1;

        // Probe
        let latency_ms = match self.probe.measure().await {
            Ok(rtt) => Some(rtt.as_secs_f64() * 1000.0),
            Err(e) => {
                tracing::warn!(host = %self.probe.target(), error = %e, "Ping probe failed");
                self.summary.probe_failures += 1;
                None
            }
        };
        let sample = Sample::new(at, latency_ms);

        // Record
        let persisted = self.record(&sample).await;
        if persisted {
            self.summary.persisted += 1;
        } else {
            self.summary.store_failures += 1;
        }

        // Forward
        let dispatched = self.forward(&sample);
        if dispatched {
            self.summary.dispatched += 1;
        }

        // Window + render
        self.window.push(sample, at);
        let rendered = self.render();

        tracing::debug!(
            ts = %at,
            latency_ms = ?sample.latency_ms,
            persisted,
            dispatched,
            rendered,
            "Tick complete"
        );

        TickReport {
            sample,
            persisted,
            dispatched,
            rendered,
        }
    }

    /// Append with one retry; never waits past the next boundary.
    async fn record(&mut self, sample: &Sample) -> bool {
        match self.store.append(sample).await {
            Ok(id) => {
                tracing::trace!(id, "Sample stored");
                return true;
            }
            Err(e) => {
                tracing::warn!(ts = %sample.ts, error = %e, "Store append failed, retrying");
            }
        }

        let backoff = self.retry_backoff(sample.ts);
        if !backoff.is_zero() {
            let now = self.clock.now();
            let wake = chrono::TimeDelta::from_std(backoff)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(now);
            self.clock.sleep_until(wake).await;
        }

        match self.store.append(sample).await {
            Ok(id) => {
                tracing::info!(id, ts = %sample.ts, "Sample stored on retry");
                true
            }
            Err(e) => {
                tracing::error!(
                    ts = %sample.ts,
                    latency_ms = ?sample.latency_ms,
                    error = %e,
                    "Store append failed, sample not persisted"
                );
                false
            }
        }
    }

    /// Backoff capped at half the time left before the next boundary.
    fn retry_backoff(&self, at: DateTime<Utc>) -> Duration {
        let boundary = next_tick(at, self.interval);
        let remaining = (boundary - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        STORE_RETRY_BACKOFF.min(remaining / 2)
    }

    /// Dispatch to the forwarder on its own task.
    fn forward(&self, sample: &Sample) -> bool {
        let Some(forwarder) = &self.forwarder else {
            return false;
        };
        if !sample.is_success() {
            return false;
        }

        let forwarder = Arc::clone(forwarder);
        let sample = *sample;
        tokio::spawn(async move {
            if let Err(e) = forwarder.send(&sample).await {
                tracing::warn!(ts = %sample.ts, error = %e, "Forwarding failed");
            }
        });
        true
    }

    fn render(&mut self) -> bool {
        let Some(renderer) = &self.renderer else {
            return false;
        };

        match renderer.render(self.window.iter()) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    path = %renderer.output().display(),
                    error = %e,
                    "Graph render failed"
                );
                self.summary.render_failures += 1;
                false
            }
        }
    }
}
