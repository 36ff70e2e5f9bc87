// src/scheduler.rs
//! Owned refresh timer with an explicit start/stop lifecycle.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::FeedEngine;

pub struct FeedScheduler {
    engine: Arc<FeedEngine>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl FeedScheduler {
    pub fn new(engine: Arc<FeedEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start ticking; the first tick fires immediately. No-op if running.
    ///
    /// Each tick spawns its refresh, so a slow gateway never holds the timer
    /// back; overlapping ticks are absorbed by the engine's in-flight flags.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let engine = Arc::clone(&self.engine);
        let period = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                counter!("feed_ticks_total").increment(1);
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    let report = engine.refresh().await;
                    tracing::debug!(
                        target: "feed",
                        poll = ?report.poll,
                        signals = ?report.signals,
                        errors = report.errors.len(),
                        "scheduled refresh"
                    );
                });
            }
        }));
        tracing::info!(target: "feed", interval_ms = period.as_millis() as u64, "scheduler started");
    }

    /// Stop ticking. Refreshes already dispatched still complete.
    pub fn stop(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
            tracing::info!(target: "feed", "scheduler stopped");
        }
    }
}

impl Drop for FeedScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
