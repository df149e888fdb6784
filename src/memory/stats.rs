//! Store statistics.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::index::VectorIndex;
use crate::memory::store::MetadataStore;

/// Snapshot of the store's shape, for inspection and monitoring surfaces.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_records: u64,
    pub by_type: HashMap<String, u64>,
    pub by_namespace: HashMap<String, u64>,
    pub edge_count: u64,
    pub modality_count: u64,
    pub indexed_by_modality: HashMap<String, u64>,
    pub total_recalls: u64,
    pub db_size_bytes: u64,
}

/// Compute statistics over the current in-memory state. `db_path` is only
/// used for the on-disk size; pass `None` for unsaved stores.
pub fn store_stats(
    store: &MetadataStore,
    modalities: &BTreeMap<String, VectorIndex>,
    db_path: Option<&Path>,
) -> StatsResponse {
    let mut by_type: HashMap<String, u64> = HashMap::new();
    let mut by_namespace: HashMap<String, u64> = HashMap::new();
    let mut edge_count = 0u64;
    let mut total_recalls = 0u64;

    for (_, meta) in store.iter() {
        *by_type.entry(meta.context_type.to_string()).or_insert(0) += 1;
        let ns = if meta.namespace_id.is_empty() {
            "(none)".to_string()
        } else {
            meta.namespace_id.clone()
        };
        *by_namespace.entry(ns).or_insert(0) += 1;
        edge_count += meta.edges.len() as u64;
        total_recalls += meta.recall_count as u64;
    }

    let indexed_by_modality = modalities
        .iter()
        .map(|(name, idx)| (name.clone(), idx.element_count() as u64))
        .collect();

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    StatsResponse {
        total_records: store.len() as u64,
        by_type,
        by_namespace,
        edge_count,
        modality_count: modalities.len() as u64,
        indexed_by_modality,
        total_recalls,
        db_size_bytes,
    }
}
