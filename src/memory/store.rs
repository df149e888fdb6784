//! Key to metadata mapping and its invariant-preserving mutations.
//!
//! [`MetadataStore`] owns every record. All writes funnel through a small set
//! of entry points so the edge-uniqueness invariant holds no matter the call
//! sequence: [`MetadataStore::upsert`] for ingestion, [`MetadataStore::touch`]
//! for salience, [`MetadataStore::replace`] for wholesale updates.

use std::collections::BTreeMap;

use crate::memory::types::Metadata;

/// All records, keyed by the caller-assigned u64. Backed by a `BTreeMap` so
/// iteration (and therefore persistence) is deterministic.
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: BTreeMap<u64, Metadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Metadata> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Metadata> {
        self.records.get_mut(&id)
    }

    /// Record for `id`, creating an empty one if absent. Used by auto-link,
    /// which may attach edges to keys that only ever received a vector.
    pub fn get_or_default(&mut self, id: u64) -> &mut Metadata {
        self.records.entry(id).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Metadata)> {
        self.records.iter().map(|(id, meta)| (*id, meta))
    }

    /// Insert a record exactly as given. Load path only; `upsert` is the
    /// ingestion entry point.
    pub fn insert_raw(&mut self, id: u64, meta: Metadata) {
        self.records.insert(id, meta);
    }

    /// Ingestion semantics for `add`: replace the record with the supplied
    /// metadata, except that existing edges survive when the incoming edge
    /// list is empty.
    pub fn upsert(&mut self, id: u64, mut meta: Metadata) {
        if let Some(existing) = self.records.get_mut(&id) {
            if meta.edges.is_empty() && !existing.edges.is_empty() {
                meta.edges = std::mem::take(&mut existing.edges);
            }
            *existing = meta;
        } else {
            self.records.insert(id, meta);
        }
    }

    /// Wholesale replacement for `update_metadata`. The caller resynchronizes
    /// the reverse index afterwards.
    pub fn replace(&mut self, id: u64, meta: Metadata) {
        self.records.insert(id, meta);
    }

    /// Record a search hit: bump `recall_count`, stamp `last_recalled_at`.
    /// No-op for unknown keys.
    pub fn touch(&mut self, id: u64, now: u64) {
        if let Some(meta) = self.records.get_mut(&id) {
            meta.recall_count += 1;
            meta.last_recalled_at = now;
        }
    }

    /// No-op for unknown keys.
    pub fn update_importance(&mut self, id: u64, importance: f32) {
        if let Some(meta) = self.records.get_mut(&id) {
            meta.importance = importance;
        }
    }
}
