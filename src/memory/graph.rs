//! The typed edge graph: linking, the derived reverse index, and
//! similarity-driven auto-linking.
//!
//! Out-edges live on each record's metadata; [`ReverseIndex`] is a cache of
//! the inverted view, rebuilt from scratch on load and resynchronized on
//! every edge mutation. It is never the source of truth.

use std::collections::HashMap;

use tracing::info;

use crate::index::VectorIndex;
use crate::memory::scoring::similarity;
use crate::memory::store::MetadataStore;
use crate::memory::types::{Edge, IncomingEdge, Metadata};

/// Target id to incoming edges, in the order the forward edges were authored.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    incoming: HashMap<u64, Vec<IncomingEdge>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct the whole inverted view from all records' out-edges.
    /// The authoritative contract; write-through during mutation is an
    /// optimization on top of this.
    pub fn rebuild(&mut self, store: &MetadataStore) {
        self.incoming.clear();
        for (id, meta) in store.iter() {
            for e in &meta.edges {
                self.push(e.target_id, id, &e.rel_type, e.weight);
            }
        }
    }

    pub fn push(&mut self, target_id: u64, source_id: u64, rel_type: &str, weight: f32) {
        self.incoming.entry(target_id).or_default().push(IncomingEdge {
            source_id,
            rel_type: rel_type.to_string(),
            weight,
        });
    }

    /// Drop every incoming entry authored by `source_id`, ahead of that
    /// record's edge list being replaced.
    pub fn remove_source(&mut self, source_id: u64) {
        for list in self.incoming.values_mut() {
            list.retain(|ie| ie.source_id != source_id);
        }
    }

    pub fn get(&self, id: u64) -> &[IncomingEdge] {
        self.incoming.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Append a typed edge from `from` to `to`. Silent no-op when `from` is not a
/// known record or when an edge with the same `(target, rel_type)` pair
/// already exists; in the duplicate case the original weight is kept.
pub fn link(
    store: &mut MetadataStore,
    reverse: &mut ReverseIndex,
    from: u64,
    to: u64,
    rel_type: &str,
    weight: f32,
) {
    let Some(meta) = store.get_mut(from) else {
        return;
    };
    if meta.has_edge(to, rel_type) {
        return;
    }
    meta.edges.push(Edge::new(to, rel_type, weight));
    reverse.push(to, from, rel_type, weight);
}

/// Out-edge snapshot in insertion order; empty for unknown records.
pub fn get_edges(store: &MetadataStore, id: u64) -> Vec<Edge> {
    store.get(id).map(|m| m.edges.clone()).unwrap_or_default()
}

/// Incoming-edge snapshot; empty when nothing points here.
pub fn get_incoming(reverse: &ReverseIndex, id: u64) -> Vec<IncomingEdge> {
    reverse.get(id).to_vec()
}

/// Replace a record wholesale and resynchronize the reverse index for it:
/// every incoming entry sourced at `id` is dropped, then the new edge list is
/// pushed through.
pub fn update_metadata(
    store: &mut MetadataStore,
    reverse: &mut ReverseIndex,
    id: u64,
    meta: Metadata,
) {
    store.replace(id, meta);
    resync_source(store, reverse, id);
}

/// Re-derive the reverse-index entries authored by `id` from its current
/// edge list.
pub fn resync_source(store: &MetadataStore, reverse: &mut ReverseIndex, id: u64) {
    reverse.remove_source(id);
    if let Some(meta) = store.get(id) {
        for e in &meta.edges {
            reverse.push(e.target_id, id, &e.rel_type, e.weight);
        }
    }
}

/// Sweep a modality and link each point to its near neighbors. For every
/// indexed key, kNN with `candidates + 1` (the extra slot absorbs the self
/// hit), convert distance to similarity, and add an edge weighted by that
/// similarity when it clears `threshold` and no `(target, rel_type)` edge
/// exists yet. Returns the number of edges created.
pub fn auto_link(
    index: &VectorIndex,
    store: &mut MetadataStore,
    reverse: &mut ReverseIndex,
    threshold: f32,
    rel_type: &str,
    candidates: usize,
) -> u64 {
    let mut links_created = 0u64;

    let points: Vec<(u64, Vec<f32>)> = index
        .iter_points()
        .map(|(key, vec)| (key, vec.to_vec()))
        .collect();

    for (from_id, query) in points {
        for (dist, to_id) in index.search_knn(&query, candidates + 1, None) {
            if to_id == from_id {
                continue;
            }
            let sim = similarity(dist);
            if sim < threshold {
                continue;
            }
            let meta = store.get_or_default(from_id);
            if meta.has_edge(to_id, rel_type) {
                continue;
            }
            meta.edges.push(Edge::new(to_id, rel_type, sim));
            reverse.push(to_id, from_id, rel_type, sim);
            links_created += 1;
        }
    }

    info!(links_created, threshold, rel_type, "auto-link sweep complete");
    links_created
}
