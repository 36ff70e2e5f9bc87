// src/filter.rs
//! Filter configuration and the evaluator that turns the canonical
//! collection into the visible subset.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::model::{Event, Sentiment};

/// Wire sentinel for "match anything".
pub const MATCH_ANY: &str = "ALL";

/// A categorical filter: either the "match anything" sentinel or one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Choice<T> {
    #[default]
    Any,
    Only(T),
}

impl<T: PartialEq> Choice<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Choice::Any)
    }

    /// `Any` accepts everything, including a missing value.
    pub fn accepts(&self, value: Option<&T>) -> bool {
        match self {
            Choice::Any => true,
            Choice::Only(want) => value == Some(want),
        }
    }
}

impl Choice<String> {
    /// Record values are compared trimmed, the same way facets offer them.
    pub fn accepts_str(&self, value: Option<&str>) -> bool {
        match self {
            Choice::Any => true,
            Choice::Only(want) => value.map(str::trim) == Some(want.as_str()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Any => f.write_str(MATCH_ANY),
            Choice::Only(v) => v.fmt(f),
        }
    }
}

impl<T> FromStr for Choice<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(MATCH_ANY) {
            return Ok(Choice::Any);
        }
        s.parse::<T>().map(Choice::Only).map_err(|e| e.to_string())
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Choice<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw {
            None => Ok(Choice::Any),
            Some(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// User-controlled filter state. Created with defaults, changed only by
/// explicit user intent, reset on demand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub search_term: String,
    pub min_relevance: f64,
    pub min_confidence: f64,
    pub min_novelty: f64,
    pub category: Choice<String>,
    pub sentiment: Choice<Sentiment>,
    pub source: Choice<String>,
    pub session: Choice<String>,
}

impl FilterConfig {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when every predicate holds. Missing optional fields fall back to
    /// 0 for thresholds and "no value" for categorical matches.
    pub fn matches(&self, ev: &Event) -> bool {
        self.matches_search(ev)
            && ev.relevance_score.unwrap_or(0.0) >= self.min_relevance
            && ev.confidence().unwrap_or(0.0) >= self.min_confidence
            && ev.novelty_score.unwrap_or(0.0) >= self.min_novelty
            && self.matches_category(ev)
            && self.sentiment.accepts(Some(&ev.sentiment))
            && self.source.accepts_str(ev.source.as_deref())
            && self.session.accepts_str(ev.session())
    }

    /// Visible subset, preserving collection order.
    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }

    fn matches_search(&self, ev: &Event) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let needle = self.search_term.to_lowercase();
        [ev.headline.as_deref(), ev.title.as_deref(), ev.summary.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(&needle))
    }

    fn matches_category(&self, ev: &Event) -> bool {
        match &self.category {
            Choice::Any => true,
            Choice::Only(cat) => ev.tags.iter().any(|t| t.trim() == cat),
        }
    }
}
