// src/facets.rs
//! Facet vocabulary derived from whatever is currently held. Recomputed in
//! full on every read; no incremental bookkeeping.

use serde::Serialize;
use std::collections::HashSet;

use crate::filter::Choice;
use crate::model::Event;

/// Distinct values in first-seen order, without the "match anything" entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FacetSet(Vec<String>);

impl FacetSet {
    fn collect<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for v in values {
            let v = v.trim();
            if !v.is_empty() && seen.insert(v) {
                out.push(v.to_string());
            }
        }
        Self(out)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Options as offered to the UI: "match anything" first, then values.
    pub fn options(&self) -> Vec<Choice<String>> {
        std::iter::once(Choice::Any)
            .chain(self.0.iter().cloned().map(Choice::Only))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub categories: FacetSet,
    pub sources: FacetSet,
    pub sessions: FacetSet,
}

pub fn derive_facets(events: &[Event]) -> Facets {
    Facets {
        categories: FacetSet::collect(
            events.iter().flat_map(|e| e.tags.iter().map(String::as_str)),
        ),
        sources: FacetSet::collect(events.iter().filter_map(|e| e.source.as_deref())),
        sessions: FacetSet::collect(events.iter().filter_map(|e| e.session())),
    }
}
