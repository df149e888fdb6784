//! Context chains: direct vector hits plus their graph neighborhood.
//!
//! A chain is seeded by kNN, then expanded breadth-first over both edge
//! directions up to a hop budget. Nodes keep the hop at which they were first
//! reached; seeds score by similarity, expanded nodes by hop decay, both
//! modulated by importance and stickiness. Edges are deduplicated on the
//! `(source, target, rel_type)` triple, first weight kept.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use crate::index::VectorIndex;
use crate::memory::graph::ReverseIndex;
use crate::memory::scoring::{similarity, stickiness};
use crate::memory::store::MetadataStore;
use crate::memory::types::Metadata;

/// One node of a chain. `similarity` is 0 for nodes reached only via graph
/// expansion; `hop` is 0 for direct search hits.
#[derive(Debug, Clone, Serialize)]
pub struct ContextNode {
    pub id: u64,
    pub score: f32,
    pub similarity: f32,
    pub hop: u32,
    pub metadata: Metadata,
}

/// One traversed adjacency, in forward orientation regardless of which
/// direction the walk crossed it.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEdge {
    pub source: u64,
    pub target: u64,
    pub rel_type: String,
    pub weight: f32,
}

#[derive(Debug, Default, Serialize)]
pub struct ContextChainResult {
    pub nodes: Vec<ContextNode>,
    pub edges: Vec<ContextEdge>,
}

/// Seed with `k` nearest records, expand `hops` levels over out- and
/// in-edges, score every visited node. Seeds are touched like search hits;
/// expanded nodes are not. Dangling edge targets are walked and surface with
/// default metadata.
pub fn context_chain(
    index: &VectorIndex,
    store: &mut MetadataStore,
    reverse: &ReverseIndex,
    query: &[f32],
    k: usize,
    hops: u32,
    now: u64,
) -> ContextChainResult {
    // Seed: direct vector hits, each recorded with its similarity and touched.
    let mut seed_sim: HashMap<u64, f32> = HashMap::new();
    for (dist, id) in index.search_knn(query, k, None) {
        seed_sim.insert(id, similarity(dist));
        store.touch(id, now);
    }

    // BFS over both edge directions. `visited` pins each node to the hop at
    // which it was first reached.
    let mut visited: HashMap<u64, u32> = HashMap::new();
    let mut queue: VecDeque<(u64, u32)> = VecDeque::new();
    for &id in seed_sim.keys() {
        visited.insert(id, 0);
        queue.push_back((id, 0));
    }

    let mut collected: Vec<ContextEdge> = Vec::new();
    while let Some((cur, cur_hop)) = queue.pop_front() {
        if cur_hop >= hops {
            continue;
        }
        if let Some(meta) = store.get(cur) {
            for e in &meta.edges {
                collected.push(ContextEdge {
                    source: cur,
                    target: e.target_id,
                    rel_type: e.rel_type.clone(),
                    weight: e.weight,
                });
                if !visited.contains_key(&e.target_id) {
                    visited.insert(e.target_id, cur_hop + 1);
                    queue.push_back((e.target_id, cur_hop + 1));
                }
            }
        }
        for ie in reverse.get(cur) {
            collected.push(ContextEdge {
                source: ie.source_id,
                target: cur,
                rel_type: ie.rel_type.clone(),
                weight: ie.weight,
            });
            if !visited.contains_key(&ie.source_id) {
                visited.insert(ie.source_id, cur_hop + 1);
                queue.push_back((ie.source_id, cur_hop + 1));
            }
        }
    }

    // Score every visited node.
    let mut result = ContextChainResult::default();
    for (&id, &hop) in &visited {
        let metadata = store.get(id).cloned().unwrap_or_default();
        let sim = seed_sim.get(&id).copied().unwrap_or(0.0);
        let base = if hop == 0 { sim } else { 1.0 / (1.0 + hop as f32) };
        let score = base * metadata.importance * stickiness(metadata.recall_count);
        result.nodes.push(ContextNode {
            id,
            score,
            similarity: sim,
            hop,
            metadata,
        });
    }

    // Deduplicate edges on the full triple, keeping the first-sorted weight.
    collected.sort_by(|a, b| {
        (a.source, a.target, a.rel_type.as_str()).cmp(&(b.source, b.target, b.rel_type.as_str()))
    });
    collected.dedup_by(|a, b| {
        a.source == b.source && a.target == b.target && a.rel_type == b.rel_type
    });
    result.edges = collected;

    result
        .nodes
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    result
}
