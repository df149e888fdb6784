//! Embedded context memory engine.
//!
//! feather unifies three things behind one `u64` key: a high-dimensional
//! vector per modality (approximate nearest-neighbor retrieval), a structured
//! metadata record, and a typed, weighted directed edge set. It exists to
//! answer "what context is relevant now?" for chat agents, recommendation
//! layers, and knowledge tools, and persists the whole state to a single
//! binary file.
//!
//! # Architecture
//!
//! - **Vectors**: one HNSW index per named modality (L2 space, fixed
//!   dimension per modality) via [hnsw_rs](https://crates.io/crates/hnsw_rs)
//! - **Records**: metadata keyed by caller-assigned u64, shared across
//!   modalities
//! - **Graph**: typed weighted out-edges on each record, with a derived
//!   reverse index for incoming-edge queries
//! - **Retrieval**: hybrid scoring (similarity, recency, importance,
//!   recall-history stickiness), structured filters evaluated inside the ANN
//!   traversal, and multi-hop context chains
//! - **Persistence**: one versioned little-endian file; readers migrate
//!   prior generations in memory
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`codec`]: the versioned on-disk format
//! - [`index`]: the per-modality ANN index wrapper
//! - [`memory`]: records, graph, scoring, search, chains, export
//! - [`db`]: the [`Db`] facade composing all of the above
//!
//! # Example
//!
//! ```no_run
//! use feather::{ContextType, Db, Metadata};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut db = Db::open("context.db", 4)?;
//! db.add(1, &[1.0, 0.0, 0.0, 0.0],
//!     Metadata::new("prefers terse answers", ContextType::Preference, 1_700_000_000),
//!     "text")?;
//! let hits = db.search(&[1.0, 0.0, 0.0, 0.0], 5, None, None, "text");
//! assert_eq!(hits[0].id, 1);
//! db.save()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod db;
pub mod index;
pub mod memory;

pub use config::FeatherConfig;
pub use db::{Db, DEFAULT_MODALITY};
pub use memory::chain::{ContextChainResult, ContextEdge, ContextNode};
pub use memory::filter::SearchFilter;
pub use memory::scoring::ScoringConfig;
pub use memory::search::SearchResult;
pub use memory::types::{rel_type, ContextType, Edge, IncomingEdge, Metadata};
