//! Read path: filtered kNN, salience tracking, scoring, ranking.
//!
//! The pipeline is fixed: resolve the modality, widen the candidate pool when
//! composite scoring will reorder it, run the filtered kNN, touch every
//! candidate the backend returned, score, sort, truncate. Touching the
//! widened pool (not just the returned k) is deliberate: salience is a
//! function of retrieval history, and the widened candidates were retrieved.

use serde::Serialize;
use std::cmp::Ordering;

use crate::index::VectorIndex;
use crate::memory::filter::SearchFilter;
use crate::memory::scoring::{composite_score, similarity, ScoringConfig};
use crate::memory::store::MetadataStore;
use crate::memory::types::Metadata;

/// A single ranked hit with a copy of the record at scoring time.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: u64,
    pub score: f32,
    pub metadata: Metadata,
}

/// kNN + filter + scoring pipeline over one modality.
///
/// With a [`ScoringConfig`] the candidate pool is widened to `3k` so the
/// composite reordering has material to work with; without one, hits keep
/// the plain `1 / (1 + distance)` fallback and no widening happens.
/// Candidates missing from the store score against a default record.
pub fn search(
    index: &VectorIndex,
    store: &mut MetadataStore,
    query: &[f32],
    k: usize,
    filter: Option<&SearchFilter>,
    scoring: Option<&ScoringConfig>,
    now_ts: i64,
) -> Vec<SearchResult> {
    let candidates = if scoring.is_some() { k * 3 } else { k };

    let hits = match filter {
        Some(f) => {
            let pred = |id: u64| store.get(id).map_or(false, |meta| f.matches(meta));
            index.search_knn(query, candidates, Some(&pred))
        }
        None => index.search_knn(query, candidates, None),
    };

    let mut results: Vec<SearchResult> = Vec::with_capacity(hits.len());
    for (dist, id) in hits {
        store.touch(id, now_ts.max(0) as u64);
        let metadata = store.get(id).cloned().unwrap_or_default();
        let score = match scoring {
            Some(cfg) => composite_score(dist, &metadata, cfg, now_ts),
            None => similarity(dist),
        };
        results.push(SearchResult {
            id,
            score,
            metadata,
        });
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::memory::types::ContextType;

    const NOW: i64 = 1_700_000_000;

    fn spike(at: usize) -> Vec<f32> {
        let mut v = vec![0.0; 8];
        v[at] = 1.0;
        v
    }

    fn setup(n: usize) -> (VectorIndex, MetadataStore) {
        let mut index = VectorIndex::new(8, &IndexConfig::default());
        let mut store = MetadataStore::new();
        for i in 0..n {
            let id = i as u64 + 1;
            index.add_point(&spike(i), id);
            store.upsert(id, Metadata::new(format!("record {id}"), ContextType::Fact, NOW));
        }
        (index, store)
    }

    #[test]
    fn returns_at_most_k_ranked_descending() {
        let (index, mut store) = setup(6);
        let results = search(&index, &mut store, &spike(0), 3, None, None, NOW);
        assert!(results.len() <= 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].id, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6, "exact hit scores 1.0");
    }

    #[test]
    fn touch_runs_per_returned_candidate() {
        let (index, mut store) = setup(6);
        // No scoring: pool is k, so exactly the k hits get touched.
        search(&index, &mut store, &spike(0), 2, None, None, NOW);
        let touched: usize = store.iter().filter(|(_, m)| m.recall_count > 0).count();
        assert_eq!(touched, 2);
    }

    #[test]
    fn scoring_widens_pool_and_inflates_recall() {
        let (index, mut store) = setup(6);
        let cfg = ScoringConfig::default();
        let results = search(&index, &mut store, &spike(0), 2, None, Some(&cfg), NOW);
        assert_eq!(results.len(), 2);
        // 3k = 6 candidates were retrieved and therefore touched.
        let touched: usize = store.iter().filter(|(_, m)| m.recall_count > 0).count();
        assert_eq!(touched, 6);
    }

    #[test]
    fn importance_reorders_with_scoring() {
        let (index, mut store) = setup(3);
        // Record 2 is farther from the query but much more important.
        store.update_importance(2, 10.0);
        let cfg = ScoringConfig::default();
        let results = search(&index, &mut store, &spike(0), 2, None, Some(&cfg), NOW);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn filter_excludes_before_ranking() {
        let (index, mut store) = setup(4);
        store.get_mut(1).unwrap().namespace_id = "other".into();
        for id in [2u64, 3, 4] {
            store.get_mut(id).unwrap().namespace_id = "mine".into();
        }
        let f = SearchFilter::new().namespace("mine");
        let results = search(&index, &mut store, &spike(0), 4, Some(&f), None, NOW);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.id != 1));
    }

    #[test]
    fn candidate_without_metadata_gets_default_record() {
        let mut index = VectorIndex::new(8, &IndexConfig::default());
        index.add_point(&spike(0), 42);
        let mut store = MetadataStore::new();

        let results = search(&index, &mut store, &spike(0), 1, None, None, NOW);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 42);
        assert_eq!(results[0].metadata, Metadata::default());
    }

    #[test]
    fn filter_rejects_keys_missing_from_store() {
        let mut index = VectorIndex::new(8, &IndexConfig::default());
        index.add_point(&spike(0), 42);
        let store_less = SearchFilter::new(); // empty filter still requires a record
        let mut store = MetadataStore::new();
        let results = search(&index, &mut store, &spike(0), 1, Some(&store_less), None, NOW);
        assert!(results.is_empty());
    }

    #[test]
    fn returned_metadata_reflects_the_touch() {
        let (index, mut store) = setup(1);
        let results = search(&index, &mut store, &spike(0), 1, None, None, NOW);
        assert_eq!(results[0].metadata.recall_count, 1);
        assert_eq!(results[0].metadata.last_recalled_at, NOW as u64);
    }
}
