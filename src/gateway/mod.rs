// src/gateway/mod.rs
pub mod fixture;
pub mod http;

use async_trait::async_trait;

use crate::error::FeedError;
use crate::model::{Event, Signal};

/// Opaque report download (`/api/export`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDownload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Remote source of events and signals.
///
/// Contract: `fetch_latest` returns the newest slice newest-first and is safe
/// to re-fetch; `fetch_before(c)` returns ids `< c` newest-first, with an
/// empty result meaning history is exhausted; `fetch_signals` returns the
/// full current snapshot.
#[async_trait]
pub trait FeedGateway: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Event>, FeedError>;
    async fn fetch_before(&self, cursor_id: i64) -> Result<Vec<Event>, FeedError>;
    async fn fetch_signals(&self) -> Result<Vec<Signal>, FeedError>;
    async fn export_report(&self) -> Result<ReportDownload, FeedError>;
    fn name(&self) -> &'static str;
}
