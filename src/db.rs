//! The store facade.
//!
//! [`Db`] composes the per-modality vector indices, the metadata store, and
//! the derived reverse index, and owns lifecycle and persistence. All
//! operations run on the calling thread; callers wanting shared access must
//! serialize it themselves.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::codec;
use crate::config::{FeatherConfig, IndexConfig, LinkingConfig};
use crate::index::VectorIndex;
use crate::memory::chain::{self, ContextChainResult};
use crate::memory::export;
use crate::memory::filter::SearchFilter;
use crate::memory::graph::{self, ReverseIndex};
use crate::memory::scoring::ScoringConfig;
use crate::memory::search::{self, SearchResult};
use crate::memory::stats::{self, StatsResponse};
use crate::memory::store::MetadataStore;
use crate::memory::types::{Edge, IncomingEdge, Metadata};

/// Modality every `Db` starts with.
pub const DEFAULT_MODALITY: &str = "text";

/// An embedded context store backed by a single binary file.
pub struct Db {
    path: PathBuf,
    modalities: BTreeMap<String, VectorIndex>,
    store: MetadataStore,
    reverse: ReverseIndex,
    index_config: IndexConfig,
    linking: LinkingConfig,
}

impl Db {
    /// Open (or create) the store at `path`. A missing or unreadable file
    /// yields an empty store; a "text" modality of `default_dim` is created
    /// iff the file supplied no modality of its own.
    pub fn open(path: impl AsRef<Path>, default_dim: usize) -> Result<Self> {
        Self::open_inner(
            path.as_ref(),
            default_dim,
            IndexConfig::default(),
            LinkingConfig::default(),
        )
    }

    /// Open using a [`FeatherConfig`] for the path, default dimension, and
    /// index/linking knobs.
    pub fn open_with_config(config: &FeatherConfig) -> Result<Self> {
        Self::open_inner(
            &config.resolved_db_path(),
            config.storage.default_dim,
            config.index.clone(),
            config.linking.clone(),
        )
    }

    fn open_inner(
        path: &Path,
        default_dim: usize,
        index_config: IndexConfig,
        linking: LinkingConfig,
    ) -> Result<Self> {
        let loaded = codec::load(path)?;

        let mut modalities = BTreeMap::new();
        for modality in loaded.modalities {
            let mut index = VectorIndex::new(modality.dim, &index_config);
            for (id, vector) in &modality.points {
                index.add_point(vector, *id);
            }
            modalities.insert(modality.name, index);
        }
        if modalities.is_empty() {
            modalities.insert(
                DEFAULT_MODALITY.to_string(),
                VectorIndex::new(default_dim, &index_config),
            );
        }

        let store = loaded.store;
        let mut reverse = ReverseIndex::new();
        reverse.rebuild(&store);

        info!(
            path = %path.display(),
            records = store.len(),
            modalities = modalities.len(),
            "store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            modalities,
            store,
            reverse,
            index_config,
            linking,
        })
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    /// Insert or update a record. The first insertion into a modality fixes
    /// that modality's dimension; later vectors must match it or the call
    /// fails with the store untouched. Re-adding a key replaces its metadata,
    /// except that existing edges survive an empty incoming edge list.
    pub fn add(&mut self, id: u64, vector: &[f32], meta: Metadata, modality: &str) -> Result<()> {
        let index = self
            .modalities
            .entry(modality.to_string())
            .or_insert_with(|| VectorIndex::new(vector.len(), &self.index_config));
        if vector.len() != index.dim() {
            bail!(
                "dimension mismatch for modality {modality}: index is {}, vector is {}",
                index.dim(),
                vector.len()
            );
        }
        index.add_point(vector, id);

        self.store.upsert(id, meta);
        graph::resync_source(&self.store, &mut self.reverse, id);
        Ok(())
    }

    // ── Salience ─────────────────────────────────────────────────────────────

    /// Record a retrieval of `id` outside the search path.
    pub fn touch(&mut self, id: u64) {
        self.store.touch(id, now_unix());
    }

    // ── Graph ────────────────────────────────────────────────────────────────

    /// Append a typed edge. No-op when `from` is unknown or the
    /// `(to, rel_type)` pair already exists (the original weight wins).
    pub fn link(&mut self, from: u64, to: u64, rel_type: &str, weight: f32) {
        graph::link(&mut self.store, &mut self.reverse, from, to, rel_type, weight);
    }

    pub fn get_edges(&self, id: u64) -> Vec<Edge> {
        graph::get_edges(&self.store, id)
    }

    pub fn get_incoming(&self, id: u64) -> Vec<IncomingEdge> {
        graph::get_incoming(&self.reverse, id)
    }

    /// Sweep `modality` and link near neighbors using the configured
    /// threshold, relationship, and candidate count. Returns edges created.
    pub fn auto_link(&mut self, modality: &str) -> u64 {
        let linking = self.linking.clone();
        self.auto_link_with(modality, linking.threshold, &linking.rel_type, linking.candidates)
    }

    /// [`Db::auto_link`] with explicit parameters.
    pub fn auto_link_with(
        &mut self,
        modality: &str,
        threshold: f32,
        rel_type: &str,
        candidates: usize,
    ) -> u64 {
        let Some(index) = self.modalities.get(modality) else {
            return 0;
        };
        graph::auto_link(
            index,
            &mut self.store,
            &mut self.reverse,
            threshold,
            rel_type,
            candidates,
        )
    }

    // ── Retrieval ────────────────────────────────────────────────────────────

    /// Ranked kNN over one modality. Unknown modalities return empty without
    /// touching any state.
    pub fn search(
        &mut self,
        query: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
        scoring: Option<&ScoringConfig>,
        modality: &str,
    ) -> Vec<SearchResult> {
        let Some(index) = self.modalities.get(modality) else {
            return Vec::new();
        };
        search::search(index, &mut self.store, query, k, filter, scoring, now_unix() as i64)
    }

    /// Direct hits plus their graph neighborhood up to `hops` levels.
    pub fn context_chain(
        &mut self,
        query: &[f32],
        k: usize,
        hops: u32,
        modality: &str,
    ) -> ContextChainResult {
        let Some(index) = self.modalities.get(modality) else {
            return ContextChainResult::default();
        };
        chain::context_chain(
            index,
            &mut self.store,
            &self.reverse,
            query,
            k,
            hops,
            now_unix(),
        )
    }

    // ── Export & inspection ──────────────────────────────────────────────────

    /// D3/Cytoscape-shaped JSON document of the (filtered) graph.
    pub fn export_graph_json(&self, ns_filter: &str, entity_filter: &str) -> Result<String> {
        export::export_graph_json(&self.store, ns_filter, entity_filter)
    }

    pub fn get_metadata(&self, id: u64) -> Option<Metadata> {
        self.store.get(id).cloned()
    }

    /// Copy of the stored vector; empty when the key or modality is unknown.
    pub fn get_vector(&self, id: u64, modality: &str) -> Vec<f32> {
        self.modalities
            .get(modality)
            .and_then(|index| index.get_vector(id))
            .unwrap_or_default()
    }

    /// Keys indexed in `modality`, in first-insertion order.
    pub fn get_all_ids(&self, modality: &str) -> Vec<u64> {
        self.modalities
            .get(modality)
            .map(|index| index.keys().to_vec())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StatsResponse {
        stats::store_stats(&self.store, &self.modalities, Some(&self.path))
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Replace a record wholesale and resynchronize its reverse-index entries.
    pub fn update_metadata(&mut self, id: u64, meta: Metadata) {
        graph::update_metadata(&mut self.store, &mut self.reverse, id, meta);
    }

    /// No-op for unknown keys.
    pub fn update_importance(&mut self, id: u64, importance: f32) {
        self.store.update_importance(id, importance);
    }

    /// Rebuild the derived in-edge view from scratch. Load and
    /// `update_metadata` already keep it synchronized; this is the
    /// authoritative fallback.
    pub fn rebuild_reverse_index(&mut self) {
        self.reverse.rebuild(&self.store);
    }

    // ── Persistence & info ───────────────────────────────────────────────────

    /// Write the whole store in the current format generation.
    pub fn save(&self) -> Result<()> {
        codec::save(&self.path, &self.store, &self.modalities)
    }

    /// Number of metadata records.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Dimension of `modality`, or 0 if unknown.
    pub fn dim(&self, modality: &str) -> usize {
        self.modalities.get(modality).map_or(0, VectorIndex::dim)
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "save on drop failed");
        }
    }
}

fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
