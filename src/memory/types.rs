//! Core record type definitions.
//!
//! Defines [`ContextType`] (the four context categories), [`Edge`] and
//! [`IncomingEdge`] (the typed weighted graph), and [`Metadata`] (a full
//! record). A record's identity is its caller-assigned `u64` key, shared
//! across the vector index, the metadata store, and the graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four context categories, stored on disk as a one-byte tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Stable knowledge: "the user lives in Lisbon".
    Fact,
    /// A like, dislike, or setting: "prefers dark mode".
    Preference,
    /// Something that happened at a point in time.
    Event,
    /// A conversational exchange or excerpt.
    Conversation,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Preference => "preference",
            Self::Event => "event",
            Self::Conversation => "conversation",
        }
    }

    /// On-disk tag value.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Fact => 0,
            Self::Preference => 1,
            Self::Event => 2,
            Self::Conversation => 3,
        }
    }

    /// Decode an on-disk tag. Unknown tags fall back to `Fact`, matching the
    /// reader's tolerance for files written by newer generations.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            1 => Self::Preference,
            2 => Self::Event,
            3 => Self::Conversation,
            _ => Self::Fact,
        }
    }
}

impl Default for ContextType {
    fn default() -> Self {
        Self::Fact
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" => Ok(Self::Fact),
            "preference" => Ok(Self::Preference),
            "event" => Ok(Self::Event),
            "conversation" => Ok(Self::Conversation),
            _ => Err(format!("unknown context type: {s}")),
        }
    }
}

/// Canonical relationship vocabulary. `rel_type` is free-form; these are the
/// names the engine itself emits and the ones exporters expect to see.
pub mod rel_type {
    pub const RELATED_TO: &str = "related_to";
    pub const DERIVED_FROM: &str = "derived_from";
    pub const CAUSED_BY: &str = "caused_by";
    pub const CONTRADICTS: &str = "contradicts";
    pub const SUPPORTS: &str = "supports";
    pub const PRECEDES: &str = "precedes";
    pub const PART_OF: &str = "part_of";
    pub const REFERENCES: &str = "references";
    pub const MULTIMODAL_OF: &str = "multimodal_of";
}

/// A typed, weighted out-edge. A record holds at most one edge per
/// `(target_id, rel_type)` pair; insertion order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub target_id: u64,
    pub rel_type: String,
    pub weight: f32,
}

impl Edge {
    pub fn new(target_id: u64, rel_type: impl Into<String>, weight: f32) -> Self {
        Self {
            target_id,
            rel_type: rel_type.into(),
            weight,
        }
    }
}

/// Derived in-edge view: who points at a given record. Never authored
/// directly; always reconstructable from all records' out-edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingEdge {
    pub source_id: u64,
    pub rel_type: String,
    pub weight: f32,
}

/// A full metadata record. The vector lives in the per-modality index; the
/// record is shared across modalities under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Unix seconds, caller-supplied.
    pub timestamp: i64,
    /// Score multiplier; 1.0 is neutral.
    pub importance: f32,
    #[serde(rename = "type")]
    pub context_type: ContextType,
    /// Provenance label (conversation id, document path, pipeline name).
    pub source: String,
    /// The full text content of the record.
    pub content: String,
    /// Opaque JSON array of tags; filtering uses substring containment.
    pub tags_json: String,
    /// Number of times this record has been returned by a search.
    pub recall_count: u32,
    /// Unix seconds of the last search hit, 0 if never recalled.
    pub last_recalled_at: u64,
    /// Partition tag: brand, org, tenant.
    pub namespace_id: String,
    /// Subject tag: user, customer, product.
    pub entity_id: String,
    /// Domain-specific key-value pairs, filterable per key.
    pub attributes: BTreeMap<String, String>,
    /// Typed out-edges, insertion order preserved.
    pub edges: Vec<Edge>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            timestamp: 0,
            importance: 1.0,
            context_type: ContextType::Fact,
            source: String::new(),
            content: String::new(),
            tags_json: String::new(),
            recall_count: 0,
            last_recalled_at: 0,
            namespace_id: String::new(),
            entity_id: String::new(),
            attributes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }
}

impl Metadata {
    /// Convenience constructor for the common case.
    pub fn new(content: impl Into<String>, context_type: ContextType, timestamp: i64) -> Self {
        Self {
            content: content.into(),
            context_type,
            timestamp,
            ..Self::default()
        }
    }

    /// True if an edge with the given `(target, rel_type)` pair exists.
    pub fn has_edge(&self, target_id: u64, rel_type: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.target_id == target_id && e.rel_type == rel_type)
    }
}
