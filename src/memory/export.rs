//! Graph export for visualization front-ends.
//!
//! Emits a single JSON document with `nodes` and `edges` arrays in the shape
//! D3 and Cytoscape consume. Node inclusion honors the namespace and entity
//! filters (empty filter accepts all); an edge is emitted only when both
//! endpoints made it into the node set, so dangling edges never leak into
//! the document.

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::memory::store::MetadataStore;

/// Content prefix used as the node label.
const LABEL_BYTES: usize = 60;

#[derive(Debug, Serialize)]
struct GraphNode<'a> {
    id: u64,
    label: &'a str,
    namespace_id: &'a str,
    entity_id: &'a str,
    #[serde(rename = "type")]
    context_type: u8,
    source: &'a str,
    importance: f32,
    recall_count: u32,
    timestamp: i64,
    attributes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct GraphEdge<'a> {
    source: u64,
    target: u64,
    rel_type: &'a str,
    weight: f32,
}

#[derive(Debug, Serialize)]
struct GraphDocument<'a> {
    nodes: Vec<GraphNode<'a>>,
    edges: Vec<GraphEdge<'a>>,
}

fn label_of(content: &str) -> &str {
    if content.len() <= LABEL_BYTES {
        return content;
    }
    let mut end = LABEL_BYTES;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn accepted(meta: &crate::memory::types::Metadata, ns_filter: &str, entity_filter: &str) -> bool {
    (ns_filter.is_empty() || meta.namespace_id == ns_filter)
        && (entity_filter.is_empty() || meta.entity_id == entity_filter)
}

/// Render the (filtered) context graph as a JSON string.
pub fn export_graph_json(
    store: &MetadataStore,
    ns_filter: &str,
    entity_filter: &str,
) -> Result<String> {
    let exported: HashSet<u64> = store
        .iter()
        .filter(|(_, meta)| accepted(meta, ns_filter, entity_filter))
        .map(|(id, _)| id)
        .collect();

    let mut doc = GraphDocument {
        nodes: Vec::with_capacity(exported.len()),
        edges: Vec::new(),
    };

    for (id, meta) in store.iter() {
        if !exported.contains(&id) {
            continue;
        }
        doc.nodes.push(GraphNode {
            id,
            label: label_of(&meta.content),
            namespace_id: &meta.namespace_id,
            entity_id: &meta.entity_id,
            context_type: meta.context_type.as_u8(),
            source: &meta.source,
            importance: meta.importance,
            recall_count: meta.recall_count,
            timestamp: meta.timestamp,
            attributes: &meta.attributes,
        });
        for e in &meta.edges {
            if !exported.contains(&e.target_id) {
                continue;
            }
            doc.edges.push(GraphEdge {
                source: id,
                target: e.target_id,
                rel_type: &e.rel_type,
                weight: e.weight,
            });
        }
    }

    Ok(serde_json::to_string(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{ContextType, Edge, Metadata};

    fn record(ns: &str, content: &str) -> Metadata {
        let mut m = Metadata::new(content, ContextType::Fact, 42);
        m.namespace_id = ns.into();
        m
    }

    #[test]
    fn label_truncates_at_60_bytes() {
        let long = "x".repeat(100);
        assert_eq!(label_of(&long).len(), 60);
        assert_eq!(label_of("short"), "short");
        // Multibyte content backs off to a char boundary
        let euros = "\u{20AC}".repeat(30); // 90 bytes, 60 not a boundary
        assert!(label_of(&euros).len() <= 60);
        assert!(label_of(&euros).chars().all(|c| c == '\u{20AC}'));
    }

    #[test]
    fn empty_filters_accept_all() {
        let mut store = MetadataStore::new();
        store.insert_raw(1, record("a", "one"));
        store.insert_raw(2, record("b", "two"));

        let json = export_graph_json(&store, "", "").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn namespace_filter_drops_cross_namespace_edges() {
        let mut store = MetadataStore::new();
        let mut a = record("A", "in namespace a");
        a.edges.push(Edge::new(2, "related_to", 1.0)); // into B
        a.edges.push(Edge::new(3, "supports", 0.7)); // within A
        store.insert_raw(1, a);
        store.insert_raw(2, record("B", "in namespace b"));
        store.insert_raw(3, record("A", "also a"));

        let json = export_graph_json(&store, "A", "").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();

        let node_ids: Vec<u64> = doc["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_u64().unwrap())
            .collect();
        assert_eq!(node_ids, vec![1, 3]);

        let edges = doc["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 1, "edge into namespace B is dropped");
        assert_eq!(edges[0]["target"].as_u64(), Some(3));
    }

    #[test]
    fn dangling_edges_never_exported() {
        let mut store = MetadataStore::new();
        let mut a = record("", "has dangling edge");
        a.edges.push(Edge::new(999, "references", 1.0));
        store.insert_raw(1, a);

        let json = export_graph_json(&store, "", "").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(doc["edges"].as_array().unwrap().is_empty());
    }

    #[test]
    fn hostile_strings_survive_an_external_parse() {
        let mut store = MetadataStore::new();
        let mut m = record("ns\"quoted\"", "line one\nline \"two\"\t\\slash\u{1}");
        m.source = "src\r\n".into();
        m.attributes.insert("k\"ey".into(), "v\nal".into());
        store.insert_raw(1, m);

        let json = export_graph_json(&store, "", "").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        let node = &doc["nodes"][0];
        assert_eq!(node["source"].as_str(), Some("src\r\n"));
        assert_eq!(node["attributes"]["k\"ey"].as_str(), Some("v\nal"));
        assert!(node["label"].as_str().unwrap().starts_with("line one\n"));
    }

    #[test]
    fn entity_filter_composes_with_namespace() {
        let mut store = MetadataStore::new();
        let mut m = record("A", "x");
        m.entity_id = "u1".into();
        store.insert_raw(1, m);
        let mut m = record("A", "y");
        m.entity_id = "u2".into();
        store.insert_raw(2, m);

        let json = export_graph_json(&store, "A", "u2").unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        let nodes = doc["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["id"].as_u64(), Some(2));
    }
}
