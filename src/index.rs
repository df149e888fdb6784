//! Per-modality vector index over the `hnsw_rs` ANN backend.
//!
//! The backend owns the navigable-small-world graph; [`VectorIndex`] owns
//! everything the engine needs around it: the fixed dimension, a key to
//! raw-vector map (the backend does not expose stored vectors by label), and
//! the first-insertion key order used for enumeration and persistence.

use hnsw_rs::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::config::IndexConfig;

/// One modality's ANN index plus raw-vector storage.
pub struct VectorIndex {
    hnsw: Hnsw<'static, f32, DistL2>,
    dim: usize,
    ef_search: usize,
    vectors: HashMap<u64, Vec<f32>>,
    /// Keys in first-insertion order; re-adds do not reorder.
    order: Vec<u64>,
}

// hnsw_rs data ids are usize; record keys are u64. The engine targets 64-bit
// platforms, where the cast is lossless.
fn to_data_id(key: u64) -> usize {
    key as usize
}

/// Adapter handing the engine's key predicate to the backend's traversal.
struct KeyFilter<'a> {
    pred: &'a dyn Fn(u64) -> bool,
}

impl hnsw_rs::filter::FilterT for KeyFilter<'_> {
    fn hnsw_filter(&self, id: &usize) -> bool {
        (self.pred)(*id as u64)
    }
}

impl VectorIndex {
    pub fn new(dim: usize, config: &IndexConfig) -> Self {
        let max_layer = 16;
        let hnsw = Hnsw::<f32, DistL2>::new(
            config.m,
            config.capacity,
            max_layer,
            config.ef_construction,
            DistL2 {},
        );
        Self {
            hnsw,
            dim,
            ef_search: config.ef_search,
            vectors: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn element_count(&self) -> usize {
        self.vectors.len()
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> &[u64] {
        &self.order
    }

    /// Insert a point, or update the stored vector for an existing key. The
    /// backend has no true update: a re-add re-inserts under the same label,
    /// and the map always holds the latest vector.
    pub fn add_point(&mut self, vector: &[f32], key: u64) {
        debug_assert_eq!(vector.len(), self.dim);
        self.hnsw.insert_slice((vector, to_data_id(key)));
        if self.vectors.insert(key, vector.to_vec()).is_none() {
            self.order.push(key);
        } else {
            debug!(key, "re-inserted vector under existing label");
        }
    }

    /// kNN over the modality. Returns `(distance, key)` pairs as the backend
    /// produced them, deduplicated by key (re-added labels can appear twice).
    /// The optional predicate runs inside the traversal; candidates it
    /// rejects are never surfaced.
    pub fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn Fn(u64) -> bool>,
    ) -> Vec<(f32, u64)> {
        if k == 0 || self.vectors.is_empty() {
            return Vec::new();
        }
        let ef = self.ef_search.max(k);
        let neighbours = match filter {
            Some(pred) => {
                let wrapper = KeyFilter { pred };
                self.hnsw.search_filter(query, k, ef, Some(&wrapper))
            }
            None => self.hnsw.search(query, k, ef),
        };

        let mut seen = std::collections::HashSet::new();
        neighbours
            .into_iter()
            .map(|n| (n.distance, n.d_id as u64))
            .filter(|(_, key)| seen.insert(*key))
            .collect()
    }

    /// Copy of the stored vector for `key`, if present.
    pub fn get_vector(&self, key: u64) -> Option<Vec<f32>> {
        self.vectors.get(&key).cloned()
    }

    /// `(key, vector)` pairs in first-insertion order, for persistence and
    /// auto-link enumeration.
    pub fn iter_points(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.order
            .iter()
            .filter_map(|key| self.vectors.get(key).map(|v| (*key, v.as_slice())))
    }
}
