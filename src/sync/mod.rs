// src/sync/mod.rs
//! Synchronizer: owns the canonical, deduplicated, newest-first event
//! collection and keeps it current via polling and backward pagination.
//!
//! Network calls run without holding any lock. Only the merge-and-resort step
//! takes the state mutex, so a poll and a page fetch may overlap on the wire
//! but their merges are applied one at a time against the latest held ids.
//! Readers get an `Arc` snapshot that is swapped in whole after each merge.

pub mod merge;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::gateway::FeedGateway;
use crate::model::Event;
use crate::sync::merge::{merge_batch, MergeEnd};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_poll_total", "Completed pollLatest gateway calls.");
        describe_counter!("feed_poll_errors_total", "Failed pollLatest gateway calls.");
        describe_counter!(
            "feed_events_added_total",
            "Events merged into the canonical collection."
        );
        describe_counter!("feed_page_total", "Completed loadOlder gateway calls.");
        describe_counter!("feed_page_errors_total", "Failed loadOlder gateway calls.");
        describe_gauge!("feed_events_held", "Events currently held in the collection.");
        describe_gauge!(
            "feed_last_sync_ts",
            "Unix ts of the last successful poll."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Gateway answered; `added` new ids were merged (possibly zero).
    Merged { added: usize },
    /// Another poll is still outstanding; nothing was dispatched.
    InFlight,
    /// The engine was torn down; the response was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Appended { added: usize },
    /// Gateway returned an empty page; history is exhausted.
    Exhausted,
    /// Nothing to page from (empty collection) or already exhausted.
    NoMoreData,
    InFlight,
    /// Torn down, or a full reset happened while the page was in flight.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub has_more: bool,
    pub loading_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityState {
    /// True until the first poll succeeds.
    pub loading: bool,
    /// A poll is currently outstanding.
    pub polling: bool,
    pub last_successful_sync: Option<DateTime<Utc>>,
    /// Outstanding failure, poll first. Each call kind clears only its own.
    pub last_error: Option<String>,
    pub poll_error: Option<String>,
    pub page_error: Option<String>,
}

#[derive(Debug, Default)]
struct FeedState {
    events: Arc<Vec<Event>>,
    exhausted: bool,
    synced_once: bool,
    last_successful_sync: Option<DateTime<Utc>>,
    poll_error: Option<FeedError>,
    page_error: Option<FeedError>,
    /// Bumped by `reset`; page results from an older generation are dropped.
    generation: u64,
}

impl FeedState {
    fn current_error(&self) -> Option<&FeedError> {
        self.poll_error.as_ref().or(self.page_error.as_ref())
    }
}

/// Non-reentrancy flag, released on drop (including on early error return).
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Synchronizer {
    gateway: Arc<dyn FeedGateway>,
    state: Mutex<FeedState>,
    polling: AtomicBool,
    paging: AtomicBool,
    torn_down: AtomicBool,
}

impl Synchronizer {
    pub fn new(gateway: Arc<dyn FeedGateway>) -> Self {
        ensure_metrics_described();
        Self {
            gateway,
            state: Mutex::new(FeedState::default()),
            polling: AtomicBool::new(false),
            paging: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().expect("feed state mutex poisoned")
    }

    /// Consistent read-only snapshot of the canonical collection.
    pub fn events(&self) -> Arc<Vec<Event>> {
        Arc::clone(&self.lock().events)
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pagination(&self) -> PaginationState {
        PaginationState {
            has_more: !self.lock().exhausted,
            loading_more: self.paging.load(Ordering::Acquire),
        }
    }

    pub fn connectivity(&self) -> ConnectivityState {
        let st = self.lock();
        ConnectivityState {
            loading: !st.synced_once,
            polling: self.polling.load(Ordering::Acquire),
            last_successful_sync: st.last_successful_sync,
            last_error: st.current_error().map(ToString::to_string),
            poll_error: st.poll_error.as_ref().map(ToString::to_string),
            page_error: st.page_error.as_ref().map(ToString::to_string),
        }
    }

    /// Outstanding failure of either call kind, poll first.
    pub fn last_error(&self) -> Option<FeedError> {
        self.lock().current_error().cloned()
    }

    /// Pull the newest slice and merge genuinely new ids into the collection.
    pub async fn poll_latest(&self) -> Result<PollOutcome, FeedError> {
        if self.is_torn_down() {
            return Ok(PollOutcome::Discarded);
        }
        let Some(_guard) = InFlight::acquire(&self.polling) else {
            debug!(target: "feed", "poll skipped: previous poll still in flight");
            return Ok(PollOutcome::InFlight);
        };

        let fetched = self.gateway.fetch_latest().await;

        if self.is_torn_down() {
            debug!(target: "feed", "poll response dropped after teardown");
            return Ok(PollOutcome::Discarded);
        }

        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                warn!(target: "feed", error = %e, gateway = self.gateway.name(), "poll failed");
                counter!("feed_poll_errors_total").increment(1);
                self.lock().poll_error = Some(e.clone());
                return Err(e);
            }
        };

        let now = Utc::now();
        let (added, held) = {
            let mut st = self.lock();
            let added = match merge_batch(&st.events, batch, MergeEnd::Front) {
                Some(merged) => {
                    let added = merged.len() - st.events.len();
                    st.events = Arc::new(merged);
                    added
                }
                None => 0,
            };
            st.synced_once = true;
            st.last_successful_sync = Some(now);
            st.poll_error = None;
            (added, st.events.len())
        };

        counter!("feed_poll_total").increment(1);
        counter!("feed_events_added_total").increment(added as u64);
        gauge!("feed_events_held").set(held as f64);
        gauge!("feed_last_sync_ts").set(now.timestamp() as f64);

        if added > 0 {
            info!(target: "feed", added, held, "poll merged new events");
        } else {
            debug!(target: "feed", held, "poll found nothing new");
        }
        Ok(PollOutcome::Merged { added })
    }

    /// Extend held history backward from the oldest held id.
    pub async fn load_older(&self) -> Result<PageOutcome, FeedError> {
        if self.is_torn_down() {
            return Ok(PageOutcome::Discarded);
        }
        let Some(_guard) = InFlight::acquire(&self.paging) else {
            debug!(target: "feed", "load_older skipped: page request in flight");
            return Ok(PageOutcome::InFlight);
        };

        let (cursor, generation) = {
            let st = self.lock();
            if st.exhausted {
                return Ok(PageOutcome::NoMoreData);
            }
            match st.events.last() {
                Some(oldest) => (oldest.id, st.generation),
                None => return Ok(PageOutcome::NoMoreData),
            }
        };

        let fetched = self.gateway.fetch_before(cursor).await;

        if self.is_torn_down() {
            debug!(target: "feed", cursor, "page response dropped after teardown");
            return Ok(PageOutcome::Discarded);
        }

        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                warn!(target: "feed", error = %e, cursor, gateway = self.gateway.name(), "load_older failed");
                counter!("feed_page_errors_total").increment(1);
                self.lock().page_error = Some(e.clone());
                return Err(e);
            }
        };
        counter!("feed_page_total").increment(1);

        let mut st = self.lock();
        if st.generation != generation {
            debug!(target: "feed", cursor, "page response dropped: collection was reset");
            return Ok(PageOutcome::Discarded);
        }
        st.page_error = None;

        if batch.is_empty() {
            st.exhausted = true;
            info!(target: "feed", cursor, "history exhausted");
            return Ok(PageOutcome::Exhausted);
        }

        let added = match merge_batch(&st.events, batch, MergeEnd::Back) {
            Some(merged) => {
                let added = merged.len() - st.events.len();
                st.events = Arc::new(merged);
                added
            }
            None => 0,
        };
        let held = st.events.len();
        drop(st);

        counter!("feed_events_added_total").increment(added as u64);
        gauge!("feed_events_held").set(held as f64);
        info!(target: "feed", cursor, added, held, "loaded older events");
        Ok(PageOutcome::Appended { added })
    }

    /// Full reset: drops held events and the exhaustion flag.
    pub fn reset(&self) {
        let mut st = self.lock();
        st.events = Arc::new(Vec::new());
        st.exhausted = false;
        st.page_error = None;
        st.generation += 1;
        gauge!("feed_events_held").set(0.0);
        info!(target: "feed", generation = st.generation, "collection reset");
    }

    /// Tear down: responses still in flight become no-ops.
    pub fn shutdown(&self) {
        self.torn_down.store(true, Ordering::Release);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}
