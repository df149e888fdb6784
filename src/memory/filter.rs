//! Structured search-time filtering.
//!
//! A [`SearchFilter`] is a conjunction of optional clauses evaluated against a
//! record's metadata, both inside the ANN traversal (the backend calls the
//! predicate per candidate) and post-hoc. Absent clauses impose no constraint.

use std::collections::BTreeMap;

use crate::memory::types::{ContextType, Metadata};

/// Predicate over [`Metadata`]. A record matches iff every supplied clause
/// matches.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Record type must be one of these.
    pub types: Option<Vec<ContextType>>,
    /// Exact source equality.
    pub source: Option<String>,
    /// Source starts with this prefix.
    pub source_prefix: Option<String>,
    /// Inclusive lower timestamp bound.
    pub timestamp_after: Option<i64>,
    /// Inclusive upper timestamp bound.
    pub timestamp_before: Option<i64>,
    /// Importance at or above this value.
    pub importance_gte: Option<f32>,
    /// Every listed tag must occur as a substring of `tags_json`.
    pub tags_contains: Option<Vec<String>>,
    /// Exact namespace equality.
    pub namespace_id: Option<String>,
    /// Exact entity equality.
    pub entity_id: Option<String>,
    /// Every pair must be present in the record's attributes with equal value.
    pub attributes_match: Option<BTreeMap<String, String>>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builder surface ──────────────────────────────────────────────────────

    pub fn types(mut self, types: impl IntoIterator<Item = ContextType>) -> Self {
        self.types = Some(types.into_iter().collect());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix = Some(prefix.into());
        self
    }

    pub fn after(mut self, ts: i64) -> Self {
        self.timestamp_after = Some(ts);
        self
    }

    pub fn before(mut self, ts: i64) -> Self {
        self.timestamp_before = Some(ts);
        self
    }

    pub fn min_importance(mut self, importance: f32) -> Self {
        self.importance_gte = Some(importance);
        self
    }

    pub fn contains_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags_contains = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes_match
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ── Evaluation ───────────────────────────────────────────────────────────

    pub fn matches(&self, meta: &Metadata) -> bool {
        if let Some(types) = &self.types {
            if !types.contains(&meta.context_type) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if meta.source != *source {
                return false;
            }
        }
        if let Some(prefix) = &self.source_prefix {
            if !meta.source.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(after) = self.timestamp_after {
            if meta.timestamp < after {
                return false;
            }
        }
        if let Some(before) = self.timestamp_before {
            if meta.timestamp > before {
                return false;
            }
        }
        if let Some(floor) = self.importance_gte {
            if meta.importance < floor {
                return false;
            }
        }
        if let Some(tags) = &self.tags_contains {
            // No JSON parse: raw substring containment on tags_json.
            for tag in tags {
                if !meta.tags_json.contains(tag.as_str()) {
                    return false;
                }
            }
        }
        if let Some(ns) = &self.namespace_id {
            if meta.namespace_id != *ns {
                return false;
            }
        }
        if let Some(eid) = &self.entity_id {
            if meta.entity_id != *eid {
                return false;
            }
        }
        if let Some(attrs) = &self.attributes_match {
            for (key, val) in attrs {
                if meta.attributes.get(key) != Some(val) {
                    return false;
                }
            }
        }
        true
    }
}
