//! Status Aggregator
//!
//! Tallies status reports into fixed, wall-clock windows and publishes the
//! most frequent status of each closed window as the current verdict.
//!
//! A single task owns the live tally. Reports and tally queries reach it
//! through an unbounded channel, and the window timer fires inside the same
//! `select!` loop, so recording and rollover never run concurrently. The
//! verdict of the last closed window is published behind a `RwLock` that the
//! task writes once per window and readers take only briefly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::error::{Error, Result};
use crate::types::StatusCode;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Length of one tally window
    pub window: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// Tally
// ============================================================================

/// Per-status report counts for one window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    counts: BTreeMap<StatusCode, u64>,
}

impl Tally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one report
    pub fn record(&mut self, code: StatusCode) {
        *self.counts.entry(code).or_insert(0) += 1;
    }

    /// Reports counted for `code`
    pub fn count(&self, code: StatusCode) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Reports counted across all statuses
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Whether nothing was counted
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Raw counts, ordered by status
    pub fn counts(&self) -> &BTreeMap<StatusCode, u64> {
        &self.counts
    }

    /// The status with the highest count
    ///
    /// An empty tally yields `Unknown`. On a tie the status declared first in
    /// [`StatusCode`] wins, since only a strictly higher count replaces the
    /// current leader while walking the statuses in order.
    pub fn dominant(&self) -> StatusCode {
        let mut leader: Option<(StatusCode, u64)> = None;
        for (&code, &count) in &self.counts {
            match leader {
                Some((_, best)) if count <= best => {}
                _ => leader = Some((code, count)),
            }
        }
        leader.map(|(code, _)| code).unwrap_or_default()
    }
}

// ============================================================================
// Window Summary
// ============================================================================

/// Published result of the most recently closed window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    /// Dominant status of the closed window
    pub verdict: StatusCode,

    /// Counts the verdict was computed from
    pub tally: Tally,

    /// Number of windows closed since start
    pub windows_closed: u64,
}

// ============================================================================
// Events
// ============================================================================

/// Messages handled by the owning task
#[derive(Debug)]
enum AggregatorEvent {
    /// Count one status in the live window
    Record(StatusCode),

    /// Reply with a copy of the live tally
    LiveTally(oneshot::Sender<Tally>),
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable access point to a running aggregator
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    events: mpsc::UnboundedSender<AggregatorEvent>,
    summary: Arc<RwLock<WindowSummary>>,
    window: Duration,
}

impl AggregatorHandle {
    /// Queue one status for the live window
    ///
    /// Never waits on the owning task. If the task has stopped the report is
    /// dropped.
    pub fn record(&self, code: StatusCode) {
        if self.events.send(AggregatorEvent::Record(code)).is_err() {
            tracing::debug!(status = %code, "Aggregator stopped, dropping report");
        }
    }

    /// Verdict of the last closed window, `Unknown` before the first rollover
    pub fn current_verdict(&self) -> StatusCode {
        self.summary.read().verdict
    }

    /// Full summary of the last closed window
    pub fn summary(&self) -> WindowSummary {
        self.summary.read().clone()
    }

    /// Copy of the live tally
    ///
    /// Answered by the owning task after every report queued before this
    /// call, so the result reflects all of them.
    pub async fn live_tally(&self) -> Result<Tally> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(AggregatorEvent::LiveTally(tx))
            .map_err(|_| Error::AggregatorClosed)?;
        rx.await.map_err(|_| Error::AggregatorClosed)
    }

    /// Configured window length
    pub fn window(&self) -> Duration {
        self.window
    }
}

// ============================================================================
// Aggregator Task
// ============================================================================

/// Owner of the live tally and writer of the published verdict
pub struct Aggregator {
    /// Configuration
    config: AggregatorConfig,

    /// Inbound reports and queries
    events: mpsc::UnboundedReceiver<AggregatorEvent>,

    /// Counts for the window in progress
    live: Tally,

    /// Result of the last closed window
    summary: Arc<RwLock<WindowSummary>>,
}

impl Aggregator {
    /// Create an aggregator and the handle that feeds it
    pub fn new(config: AggregatorConfig) -> (Self, AggregatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let summary = Arc::new(RwLock::new(WindowSummary::default()));
        let handle = AggregatorHandle {
            events: tx,
            summary: Arc::clone(&summary),
            window: config.window,
        };
        let aggregator = Self {
            config,
            events: rx,
            live: Tally::new(),
            summary,
        };
        (aggregator, handle)
    }

    /// Spawn the owning task on the current runtime
    pub fn spawn(
        config: AggregatorConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> (AggregatorHandle, JoinHandle<()>) {
        let (aggregator, handle) = Self::new(config);
        let task = tokio::spawn(aggregator.run(shutdown));
        (handle, task)
    }

    /// Run until shutdown is signalled or every handle is dropped
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            window_secs = self.config.window.as_secs(),
            "Status aggregator started"
        );

        // Boundaries follow the clock from start, not report arrival.
        let mut windows = interval_at(Instant::now() + self.config.window, self.config.window);

        loop {
            tokio::select! {
                biased;

                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Status aggregator received shutdown signal");
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "Aggregator broadcast receiver lagged");
                        }
                    }
                }

                _ = windows.tick() => self.rollover(),

                event = self.events.recv() => {
                    match event {
                        Some(AggregatorEvent::Record(code)) => self.record(code),
                        Some(AggregatorEvent::LiveTally(reply)) => {
                            let _ = reply.send(self.live.clone());
                        }
                        None => {
                            tracing::info!("All aggregator handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Status aggregator stopped");
    }

    fn record(&mut self, code: StatusCode) {
        self.live.record(code);
        tracing::trace!(status = %code, count = self.live.count(code), "Recorded status");
    }

    /// Close the live window and publish its dominant status
    fn rollover(&mut self) {
        let closed = std::mem::take(&mut self.live);
        let verdict = closed.dominant();

        tracing::debug!(
            verdict = %verdict,
            reports = closed.total(),
            counts = ?closed.counts(),
            "Window closed"
        );

        let mut summary = self.summary.write();
        summary.verdict = verdict;
        summary.tally = closed;
        summary.windows_closed += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn start(window: Duration) -> (AggregatorHandle, broadcast::Sender<()>, JoinHandle<()>) {
        let (tx, rx) = broadcast::channel(1);
        let (handle, task) = Aggregator::spawn(AggregatorConfig { window }, rx);
        (handle, tx, task)
    }

    /// Let the window elapse and wait until the task has rolled over
    async fn close_window(handle: &AggregatorHandle) {
        // Flush queued reports into the live window first.
        handle.live_tally().await.unwrap();
        tokio::time::advance(handle.window()).await;
        handle.live_tally().await.unwrap();
    }

    #[test]
    fn test_config_default() {
        assert_eq!(AggregatorConfig::default().window, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_tally_is_unknown() {
        let tally = Tally::new();
        assert!(tally.is_empty());
        assert_eq!(tally.total(), 0);
        assert_eq!(tally.dominant(), StatusCode::Unknown);
    }

    #[test]
    fn test_dominant_picks_highest_count() {
        let mut tally = Tally::new();
        tally.record(StatusCode::Unavailable);
        tally.record(StatusCode::Available);
        tally.record(StatusCode::Unavailable);
        assert_eq!(tally.count(StatusCode::Unavailable), 2);
        assert_eq!(tally.dominant(), StatusCode::Unavailable);

        tally.record(StatusCode::Unknown);
        tally.record(StatusCode::Unknown);
        tally.record(StatusCode::Unknown);
        assert_eq!(tally.dominant(), StatusCode::Unknown);
    }

    #[test]
    fn test_dominant_tie_prefers_declaration_order() {
        let mut tally = Tally::new();
        tally.record(StatusCode::Unavailable);
        tally.record(StatusCode::Available);
        assert_eq!(tally.dominant(), StatusCode::Available);

        let mut tally = Tally::new();
        tally.record(StatusCode::Unknown);
        tally.record(StatusCode::Unavailable);
        assert_eq!(tally.dominant(), StatusCode::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_unknown_before_first_rollover() {
        let (handle, _shutdown, _task) = start(WINDOW);
        handle.record(StatusCode::Available);
        handle.live_tally().await.unwrap();

        assert_eq!(handle.current_verdict(), StatusCode::Unknown);
        assert_eq!(handle.summary().windows_closed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_majority_wins_window() {
        let (handle, _shutdown, _task) = start(WINDOW);
        for _ in 0..3 {
            handle.record(StatusCode::Available);
        }
        handle.record(StatusCode::Unavailable);

        let live = handle.live_tally().await.unwrap();
        assert_eq!(live.count(StatusCode::Available), 3);
        assert_eq!(live.count(StatusCode::Unavailable), 1);

        close_window(&handle).await;

        assert_eq!(handle.current_verdict(), StatusCode::Available);
        let summary = handle.summary();
        assert_eq!(summary.windows_closed, 1);
        assert_eq!(summary.tally.total(), 4);
        assert!(handle.live_tally().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_window_yields_unknown() {
        let (handle, _shutdown, _task) = start(WINDOW);
        handle.record(StatusCode::Available);
        close_window(&handle).await;
        assert_eq!(handle.current_verdict(), StatusCode::Available);

        close_window(&handle).await;
        assert_eq!(handle.current_verdict(), StatusCode::Unknown);
        assert_eq!(handle.summary().windows_closed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_isolation() {
        let (handle, _shutdown, _task) = start(WINDOW);
        handle.record(StatusCode::Available);
        close_window(&handle).await;

        for _ in 0..5 {
            handle.record(StatusCode::Unavailable);
        }
        handle.live_tally().await.unwrap();

        // Reports after the rollover belong to the next window only.
        assert_eq!(handle.current_verdict(), StatusCode::Available);
        assert_eq!(handle.summary().tally.count(StatusCode::Unavailable), 0);

        close_window(&handle).await;
        assert_eq!(handle.current_verdict(), StatusCode::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_stable_between_rollovers() {
        let (handle, _shutdown, _task) = start(WINDOW);
        handle.record(StatusCode::Unavailable);
        close_window(&handle).await;

        let first = handle.current_verdict();
        for _ in 0..10 {
            handle.record(StatusCode::Available);
            assert_eq!(handle.current_verdict(), first);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 250;

        let (handle, _shutdown, _task) = start(Duration::from_secs(3600));

        let mut tasks = Vec::new();
        for _ in 0..WRITERS {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..PER_WRITER {
                    h.record(StatusCode::Available);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for _ in 0..4 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..PER_WRITER {
                    assert_eq!(h.current_verdict(), StatusCode::Unknown);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let live = handle.live_tally().await.unwrap();
        assert_eq!(live.count(StatusCode::Available), (WRITERS * PER_WRITER) as u64);
        assert_eq!(live.total(), (WRITERS * PER_WRITER) as u64);
    }

    #[tokio::test]
    async fn test_aggregator_lifecycle() {
        let (handle, shutdown, task) = start(WINDOW);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(()).unwrap();
        task.await.unwrap();

        // Reports after shutdown are dropped, queries fail.
        handle.record(StatusCode::Available);
        assert!(matches!(
            handle.live_tally().await,
            Err(Error::AggregatorClosed)
        ));
    }

    #[tokio::test]
    async fn test_stops_when_handles_dropped() {
        let (_tx, rx) = broadcast::channel::<()>(1);
        let (handle, task) = Aggregator::spawn(AggregatorConfig::default(), rx);
        drop(handle);
        task.await.unwrap();
    }
}
