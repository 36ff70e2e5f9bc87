// src/engine.rs
//! Engine facade: the Synchronizer, Signal Cache and current filter
//! configuration behind one handle, plus the derived view handed to
//! presentation.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::info;

use crate::error::FeedError;
use crate::facets::{derive_facets, Facets};
use crate::filter::FilterConfig;
use crate::gateway::{FeedGateway, ReportDownload};
use crate::model::{Event, Signal};
use crate::signals::SignalCache;
use crate::sync::{ConnectivityState, PageOutcome, PaginationState, PollOutcome, Synchronizer};

/// Result of one refresh cycle (timer tick or manual sync).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub poll: Option<PollOutcome>,
    /// Signals received, or `None` when skipped or failed.
    pub signals: Option<usize>,
    pub errors: Vec<String>,
}

impl TickReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Everything presentation needs, derived from one collection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub visible: Vec<Event>,
    pub facets: Facets,
    pub pagination: PaginationState,
    pub connectivity: ConnectivityState,
    pub total: usize,
    pub filtered_out: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    pub signals: Vec<Signal>,
    /// Seconds since the last successful refresh.
    pub age_secs: Option<i64>,
}

pub struct FeedEngine {
    gateway: Arc<dyn FeedGateway>,
    sync: Synchronizer,
    signals: SignalCache,
    filter: RwLock<FilterConfig>,
}

impl FeedEngine {
    pub fn new(gateway: Arc<dyn FeedGateway>) -> Self {
        Self {
            sync: Synchronizer::new(Arc::clone(&gateway)),
            signals: SignalCache::new(),
            filter: RwLock::new(FilterConfig::default()),
            gateway,
        }
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn signal_cache(&self) -> &SignalCache {
        &self.signals
    }

    /// One cycle: poll latest events and refresh signals concurrently.
    pub async fn refresh(&self) -> TickReport {
        let (poll, signals) = tokio::join!(
            self.sync.poll_latest(),
            self.signals.refresh(self.gateway.as_ref())
        );

        let mut errors = Vec::new();
        let poll = poll.map_err(|e| errors.push(e.to_string())).ok();
        let signals = signals
            .map_err(|e| errors.push(e.to_string()))
            .ok()
            .flatten();
        TickReport {
            poll,
            signals,
            errors,
        }
    }

    pub async fn load_more(&self) -> Result<PageOutcome, FeedError> {
        self.sync.load_older().await
    }

    pub fn filter(&self) -> FilterConfig {
        self.filter.read().expect("filter rwlock poisoned").clone()
    }

    pub fn set_filter(&self, cfg: FilterConfig) {
        *self.filter.write().expect("filter rwlock poisoned") = cfg;
    }

    pub fn update_filter<F>(&self, f: F)
    where
        F: FnOnce(&mut FilterConfig),
    {
        f(&mut self.filter.write().expect("filter rwlock poisoned"));
    }

    pub fn reset_filters(&self) {
        self.filter.write().expect("filter rwlock poisoned").reset();
    }

    /// Full reset of the held collection (filters are kept).
    pub fn reset(&self) {
        self.sync.reset();
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        self.sync.events()
    }

    pub fn view(&self) -> FeedView {
        let events = self.sync.events();
        let filter = self.filter();
        let visible = filter.apply(&events);
        FeedView {
            facets: derive_facets(&events),
            pagination: self.sync.pagination(),
            connectivity: self.sync.connectivity(),
            total: events.len(),
            filtered_out: events.len() - visible.len(),
            visible,
        }
    }

    pub fn signals(&self) -> Arc<Vec<Signal>> {
        self.signals.signals()
    }

    pub fn signal_view(&self) -> SignalView {
        SignalView {
            signals: self.signals.signals().as_ref().clone(),
            age_secs: self.signals.since_last_refresh().map(|d| d.num_seconds()),
        }
    }

    pub async fn export_report(&self) -> Result<ReportDownload, FeedError> {
        self.gateway.export_report().await
    }

    /// Tear down: responses still in flight are dropped when they land.
    pub fn shutdown(&self) {
        self.sync.shutdown();
        self.signals.close();
        info!(target: "feed", gateway = self.gateway.name(), "engine torn down");
    }
}
