// src/signals.rs
//! Latest live-signal snapshot. Each refresh replaces the whole set; there is
//! no merge and no history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::gateway::FeedGateway;
use crate::model::Signal;

#[derive(Debug, Clone)]
pub struct SignalSnapshot {
    pub signals: Arc<Vec<Signal>>,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SignalCache {
    current: Mutex<Option<SignalSnapshot>>,
    refreshing: AtomicBool,
    closed: AtomicBool,
}

impl SignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically swap in a new snapshot.
    pub fn replace(&self, signals: Vec<Signal>, at: DateTime<Utc>) {
        let snap = SignalSnapshot {
            signals: Arc::new(signals),
            refreshed_at: at,
        };
        *self.current.lock().expect("signal cache mutex poisoned") = Some(snap);
    }

    /// Fetch and replace. On failure the previous snapshot is kept.
    /// Returns `Ok(None)` when skipped (refresh in flight, or closed).
    pub async fn refresh(&self, gateway: &dyn FeedGateway) -> Result<Option<usize>, FeedError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(target: "feed", "signal refresh skipped: already in flight");
            return Ok(None);
        }

        let result = gateway.fetch_signals().await;
        self.refreshing.store(false, Ordering::Release);

        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        match result {
            Ok(signals) => {
                let n = signals.len();
                self.replace(signals, Utc::now());
                counter!("feed_signal_refresh_total").increment(1);
                Ok(Some(n))
            }
            Err(e) => {
                warn!(target: "feed", error = %e, "signal refresh failed");
                counter!("feed_signal_errors_total").increment(1);
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> Option<SignalSnapshot> {
        self.current
            .lock()
            .expect("signal cache mutex poisoned")
            .clone()
    }

    /// Current signals, empty before the first successful refresh.
    pub fn signals(&self) -> Arc<Vec<Signal>> {
        self.snapshot()
            .map(|s| s.signals)
            .unwrap_or_default()
    }

    /// Time since the last successful refresh, measured at `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.snapshot().map(|s| now - s.refreshed_at)
    }

    pub fn since_last_refresh(&self) -> Option<Duration> {
        self.age_at(Utc::now())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
