#![allow(dead_code)]

use feather::{ContextType, Db, Metadata};
use std::path::PathBuf;
use tempfile::TempDir;

/// Open a fresh store in a temp directory. The directory guard must stay
/// alive for the store's lifetime.
pub fn test_db(dim: usize) -> (Db, TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Db::open(&path, dim).unwrap();
    (db, dir, path)
}

/// Deterministic embedding with a spike at position `seed`. Distinct seeds
/// give orthogonal vectors.
pub fn test_embedding(dim: usize, seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

/// A metadata record with recognizable content.
pub fn test_meta(content: &str) -> Metadata {
    Metadata::new(content, ContextType::Fact, 1_700_000_000)
}

/// Insert a record with a spike embedding in the "text" modality.
pub fn insert_record(db: &mut Db, id: u64, dim: usize, seed: usize, content: &str) {
    db.add(id, &test_embedding(dim, seed), test_meta(content), "text")
        .unwrap();
}
