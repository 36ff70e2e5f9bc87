// src/gateway/http.rs
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::config::feed::FeedConfig;
use crate::error::FeedError;
use crate::gateway::{FeedGateway, ReportDownload};
use crate::model::{decode_events, decode_signals, Event, Signal};

const DEFAULT_REPORT_NAME: &str = "market_mind_dataset.csv";

/// Gateway backed by the Market Mind HTTP API.
pub struct HttpGateway {
    http: reqwest::Client,
    base: String,
    latest_limit: usize,
    page_size: usize,
}

impl HttpGateway {
    pub fn new(cfg: &FeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market-mind-feed/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base: cfg.api_base.trim_end_matches('/').to_string(),
            latest_limit: cfg.latest_limit,
            page_size: cfg.page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, FeedError> {
        let url = self.url(path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::network(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::network(format!("GET {url}: status {status}")));
        }
        Ok(resp)
    }

    async fn get_body(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FeedError> {
        let resp = self.get(path, query).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FeedError::network(format!("reading {path} body: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedGateway for HttpGateway {
    async fn fetch_latest(&self) -> Result<Vec<Event>, FeedError> {
        let body = self
            .get_body("/api/feed", &[("limit", self.latest_limit.to_string())])
            .await?;
        decode_events(&body)
    }

    async fn fetch_before(&self, cursor_id: i64) -> Result<Vec<Event>, FeedError> {
        let body = self
            .get_body(
                "/api/feed",
                &[
                    ("before_id", cursor_id.to_string()),
                    ("limit", self.page_size.to_string()),
                ],
            )
            .await?;
        decode_events(&body)
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>, FeedError> {
        let body = self.get_body("/api/signals", &[]).await?;
        decode_signals(&body)
    }

    async fn export_report(&self) -> Result<ReportDownload, FeedError> {
        let resp = self.get("/api/export", &[]).await?;
        let headers = resp.headers();
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|h| h.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("text/csv")
            .to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FeedError::network(format!("reading export body: {e}")))?;
        Ok(ReportDownload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Extract `filename=...` from a `Content-Disposition` header value.
fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
