// src/model.rs
//! Record model: intelligence events and live price signals as delivered by
//! the remote feed, plus tolerant decoders for both payloads.
//!
//! Only `id` (events) and `ticker` (signals) are structural. Every other field
//! is decoded leniently: a wrong type or a missing value becomes "no value"
//! instead of rejecting the record.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::FeedError;

/// Fallback label for events with no origin.
pub const UNKNOWN_SOURCE: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Critical,
    High,
    Medium,
    #[default]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Overbought,
    Oversold,
    #[default]
    Neutral,
}

/// Returned by the `FromStr` impls for labels outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Bullish => "BULLISH",
            Sentiment::Bearish => "BEARISH",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

impl FromStr for Sentiment {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BULLISH" => Ok(Sentiment::Bullish),
            "BEARISH" => Ok(Sentiment::Bearish),
            "NEUTRAL" => Ok(Sentiment::Neutral),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Impact::Critical),
            "HIGH" => Ok(Impact::High),
            "MEDIUM" => Ok(Impact::Medium),
            "LOW" => Ok(Impact::Low),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl FromStr for SignalStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OVERBOUGHT" => Ok(SignalStatus::Overbought),
            "OVERSOLD" => Ok(SignalStatus::Oversold),
            "NEUTRAL" => Ok(SignalStatus::Neutral),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Market context attached by the scoring pipeline. All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlContext {
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub session: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vix: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rsi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rvol: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub novelty: Option<f64>,
    #[serde(default)]
    pub sectors: Value,
}

/// One piece of market intelligence. `id` is the identity and sort key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub headline: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thesis: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_pkg: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "lenient_label")]
    pub impact: Impact,
    #[serde(
        rename = "relevanceScore",
        default,
        deserialize_with = "lenient_number"
    )]
    pub relevance_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_context")]
    pub ml_context: Option<MlContext>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub novelty_score: Option<f64>,
}

impl Event {
    /// Bare event with only an identity; handy for fixtures.
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Headline if present, else the body title, else empty.
    pub fn display_title(&self) -> &str {
        [self.headline.as_deref(), self.title.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }

    pub fn source_label(&self) -> &str {
        match self.source.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => UNKNOWN_SOURCE,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        self.ml_context.as_ref().and_then(|c| c.confidence)
    }

    pub fn session(&self) -> Option<&str> {
        self.ml_context.as_ref().and_then(|c| c.session.as_deref())
    }

    /// Parsed occurrence time. Naive timestamps are taken as UTC.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.date.as_deref()?)
    }
}

/// Latest technical snapshot for one tracked instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vwap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rsi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rvol: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub daily_change: Option<f64>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub status: SignalStatus,
}

/// Decode an event batch. Any element without an integer `id` rejects the
/// whole batch so a merge never sees a partially valid response.
pub fn decode_events(body: &[u8]) -> Result<Vec<Event>, FeedError> {
    let items = decode_array(body, "events")?;
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if item.get("id").and_then(Value::as_i64).is_none() {
            return Err(FeedError::data_shape(format!(
                "event at index {idx} has no integer id"
            )));
        }
        let ev: Event = serde_json::from_value(item)
            .map_err(|e| FeedError::data_shape(format!("event at index {idx}: {e}")))?;
        out.push(ev);
    }
    Ok(out)
}

pub fn decode_signals(body: &[u8]) -> Result<Vec<Signal>, FeedError> {
    let items = decode_array(body, "signals")?;
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if item.get("ticker").and_then(Value::as_str).is_none() {
            return Err(FeedError::data_shape(format!(
                "signal at index {idx} has no ticker"
            )));
        }
        let sig: Signal = serde_json::from_value(item)
            .map_err(|e| FeedError::data_shape(format!("signal at index {idx}: {e}")))?;
        out.push(sig);
    }
    Ok(out)
}

fn decode_array(body: &[u8], what: &str) -> Result<Vec<Value>, FeedError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(FeedError::data_shape(format!(
            "{what} payload is not an array (got {})",
            json_kind(&other)
        ))),
        Err(e) => Err(FeedError::data_shape(format!("{what} payload is not JSON: {e}"))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// --- lenient field decoders ---

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_label<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => T::default(),
    })
}

fn lenient_context<'de, D: Deserializer<'de>>(d: D) -> Result<Option<MlContext>, D::Error> {
    Ok(match Value::deserialize(d)? {
        v @ Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_event_with_all_fields() {
        let body = json!([{
            "id": 42,
            "title": "NVDA beats estimates",
            "headline": "Nvidia earnings",
            "source": "Bloomberg",
            "date": "2025-01-15 14:30:00",
            "relevanceScore": 8,
            "impact": "HIGH",
            "sentiment": "BULLISH",
            "summary": "Data center revenue up",
            "tags": ["NVDA", "EARNINGS"],
            "ml_context": {"confidence": 7, "session": "POWER_HOUR", "vix": 14.2},
            "novelty_score": 6
        }]);
        let evs = decode_events(body.to_string().as_bytes()).unwrap();
        assert_eq!(evs.len(), 1);
        let ev = &evs[0];
        assert_eq!(ev.id, 42);
        assert_eq!(ev.relevance_score, Some(8.0));
        assert_eq!(ev.impact, Impact::High);
        assert_eq!(ev.sentiment, Sentiment::Bullish);
        assert_eq!(ev.confidence(), Some(7.0));
        assert_eq!(ev.session(), Some("POWER_HOUR"));
        assert_eq!(ev.display_title(), "Nvidia earnings");
        assert!(ev.occurred_at().is_some());
    }

    #[test]
    fn malformed_optional_fields_become_defaults() {
        let body = json!([{
            "id": 1,
            "tags": null,
            "sentiment": "SIDEWAYS",
            "impact": 3,
            "relevanceScore": "n/a",
            "ml_context": "oops",
            "source": null
        }]);
        let evs = decode_events(body.to_string().as_bytes()).unwrap();
        let ev = &evs[0];
        assert!(ev.tags.is_empty());
        assert_eq!(ev.sentiment, Sentiment::Neutral);
        assert_eq!(ev.impact, Impact::Low);
        assert_eq!(ev.relevance_score, None);
        assert!(ev.ml_context.is_none());
        assert_eq!(ev.source_label(), UNKNOWN_SOURCE);
    }

    #[test]
    fn missing_id_rejects_whole_batch() {
        let body = json!([{"id": 3}, {"title": "no id"}]);
        let err = decode_events(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, FeedError::DataShape(_)));
    }

    #[test]
    fn non_array_payload_is_data_shape() {
        let err = decode_events(br#"{"error":"db locked"}"#).unwrap_err();
        assert!(matches!(err, FeedError::DataShape(_)));
        let err = decode_signals(b"not json").unwrap_err();
        assert!(matches!(err, FeedError::DataShape(_)));
    }

    #[test]
    fn signal_status_is_lenient() {
        let body = json!([
            {"ticker": "SPY", "price": 501.2, "rsi": 71.0, "status": "OVERBOUGHT"},
            {"ticker": "QQQ", "status": "whatever"}
        ]);
        let sigs = decode_signals(body.to_string().as_bytes()).unwrap();
        assert_eq!(sigs[0].status, SignalStatus::Overbought);
        assert_eq!(sigs[1].status, SignalStatus::Neutral);
        assert_eq!(sigs[1].price, None);
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive() {
        assert!(parse_timestamp("2025-01-15T14:30:00Z").is_some());
        assert!(parse_timestamp("2025-01-15T14:30:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
