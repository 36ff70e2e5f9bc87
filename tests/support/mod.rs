// tests/support/mod.rs
//
// Shared helpers for the integration tests: id builders and a scripted
// gateway whose answers are queued up front (including malformed or
// overlapping batches the fixture gateway never produces).
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use market_mind_feed::gateway::ReportDownload;
use market_mind_feed::{Event, FeedError, FeedGateway, Signal};

pub fn events(ids: &[i64]) -> Vec<Event> {
    ids.iter().copied().map(Event::with_id).collect()
}

pub fn ids(events: &[Event]) -> Vec<i64> {
    events.iter().map(|e| e.id).collect()
}

type Answer<T> = Result<T, FeedError>;

#[derive(Default)]
pub struct ScriptedGateway {
    latest: Mutex<VecDeque<Answer<Vec<Event>>>>,
    before: Mutex<VecDeque<Answer<Vec<Event>>>>,
    cursors: Mutex<Vec<i64>>,
    latest_calls: Mutex<usize>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_latest(&self, answer: Answer<Vec<Event>>) {
        self.latest.lock().unwrap().push_back(answer);
    }

    pub fn queue_before(&self, answer: Answer<Vec<Event>>) {
        self.before.lock().unwrap().push_back(answer);
    }

    /// Cursor ids passed to `fetch_before`, in call order.
    pub fn cursors(&self) -> Vec<i64> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn latest_calls(&self) -> usize {
        *self.latest_calls.lock().unwrap()
    }
}

#[async_trait]
impl FeedGateway for ScriptedGateway {
    async fn fetch_latest(&self) -> Result<Vec<Event>, FeedError> {
        *self.latest_calls.lock().unwrap() += 1;
        let next = self.latest.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_before(&self, cursor_id: i64) -> Result<Vec<Event>, FeedError> {
        self.cursors.lock().unwrap().push(cursor_id);
        let next = self.before.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FeedError> {
        Ok(Vec::new())
    }

    async fn export_report(&self) -> Result<ReportDownload, FeedError> {
        Err(FeedError::network("export not scripted"))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
