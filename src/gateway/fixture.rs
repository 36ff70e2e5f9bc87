// src/gateway/fixture.rs
//! In-process gateway over an in-memory "remote" store. Backs the tests and
//! the binary's `--fixture` demo mode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FeedError;
use crate::gateway::{FeedGateway, ReportDownload};
use crate::model::{Event, Signal};

const DEFAULT_LIMIT: usize = 50;

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub latest: usize,
    pub before: usize,
    pub signals: usize,
    pub export: usize,
}

#[derive(Debug, Default)]
struct Remote {
    events: Vec<Event>,
    signals: Vec<Signal>,
    failure: Option<FeedError>,
}

pub struct FixtureGateway {
    remote: Mutex<Remote>,
    latest_limit: usize,
    page_size: usize,
    latency: Option<Duration>,
    latest: AtomicUsize,
    before: AtomicUsize,
    signals: AtomicUsize,
    export: AtomicUsize,
    polls_in_flight: AtomicUsize,
    max_polls_in_flight: AtomicUsize,
}

impl FixtureGateway {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            remote: Mutex::new(Remote {
                events,
                ..Default::default()
            }),
            latest_limit: DEFAULT_LIMIT,
            page_size: DEFAULT_LIMIT,
            latency: None,
            latest: AtomicUsize::new(0),
            before: AtomicUsize::new(0),
            signals: AtomicUsize::new(0),
            export: AtomicUsize::new(0),
            polls_in_flight: AtomicUsize::new(0),
            max_polls_in_flight: AtomicUsize::new(0),
        }
    }

    /// Remote store holding ids `1..=n`.
    pub fn with_range(n: i64) -> Self {
        Self::new((1..=n).map(Event::with_id).collect())
    }

    pub fn with_limits(mut self, latest_limit: usize, page_size: usize) -> Self {
        self.latest_limit = latest_limit;
        self.page_size = page_size;
        self
    }

    /// Every call sleeps this long (tokio timer) before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_signals(self, signals: Vec<Signal>) -> Self {
        self.remote_mut().signals = signals;
        self
    }

    /// Simulate a new event arriving at the remote end.
    pub fn push_event(&self, ev: Event) {
        self.remote_mut().events.push(ev);
    }

    pub fn set_signals(&self, signals: Vec<Signal>) {
        self.remote_mut().signals = signals;
    }

    /// All calls fail with `err` until `recover` is called.
    pub fn fail_with(&self, err: FeedError) {
        self.remote_mut().failure = Some(err);
    }

    pub fn recover(&self) {
        self.remote_mut().failure = None;
    }

    pub fn calls(&self) -> GatewayCalls {
        GatewayCalls {
            latest: self.latest.load(Ordering::SeqCst),
            before: self.before.load(Ordering::SeqCst),
            signals: self.signals.load(Ordering::SeqCst),
            export: self.export.load(Ordering::SeqCst),
        }
    }

    /// Highest number of `fetch_latest` calls observed in flight at once.
    pub fn max_polls_in_flight(&self) -> usize {
        self.max_polls_in_flight.load(Ordering::SeqCst)
    }

    fn remote_mut(&self) -> std::sync::MutexGuard<'_, Remote> {
        self.remote.lock().expect("fixture remote mutex poisoned")
    }

    async fn enter(&self, counter: &AtomicUsize) -> Result<(), FeedError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        let failure = self.remote_mut().failure.clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn newest_first<F>(&self, keep: F, limit: usize) -> Vec<Event>
    where
        F: Fn(&Event) -> bool,
    {
        let remote = self.remote_mut();
        let mut out: Vec<Event> = remote.events.iter().filter(|e| keep(e)).cloned().collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out.truncate(limit);
        out
    }
}

#[async_trait]
impl FeedGateway for FixtureGateway {
    async fn fetch_latest(&self) -> Result<Vec<Event>, FeedError> {
        let now = self.polls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_polls_in_flight.fetch_max(now, Ordering::SeqCst);
        let entered = self.enter(&self.latest).await;
        self.polls_in_flight.fetch_sub(1, Ordering::SeqCst);
        entered?;
        Ok(self.newest_first(|_| true, self.latest_limit))
    }

    async fn fetch_before(&self, cursor_id: i64) -> Result<Vec<Event>, FeedError> {
        self.enter(&self.before).await?;
        Ok(self.newest_first(|e| e.id < cursor_id, self.page_size))
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FeedError> {
        self.enter(&self.signals).await?;
        Ok(self.remote_mut().signals.clone())
    }

    async fn export_report(&self) -> Result<ReportDownload, FeedError> {
        self.enter(&self.export).await?;
        let remote = self.remote_mut();
        let mut csv = String::from("id,title,source\n");
        for ev in &remote.events {
            csv.push_str(&format!(
                "{},{},{}\n",
                ev.id,
                ev.display_title().replace(',', " "),
                ev.source_label()
            ));
        }
        Ok(ReportDownload {
            filename: "market_mind_dataset.csv".to_string(),
            content_type: "text/csv".to_string(),
            bytes: csv.into_bytes(),
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
