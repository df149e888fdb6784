//! Versioned binary file envelope.
//!
//! One contiguous little-endian stream: a magic/version header, the metadata
//! section, then per-modality vector dumps. Writers only produce the current
//! generation; readers accept generation 2 and later, migrating older files
//! in memory. A missing file, short header, or wrong magic loads as an empty
//! store: open never fails on file content.
//!
//! Durability is exactly "the file as of the last successful save". No
//! sidecar files, no journal, no checksum.

pub mod record;

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::index::VectorIndex;
use crate::memory::store::MetadataStore;

/// "FEAT" as a little-endian u32.
pub const MAGIC: u32 = 0x4645_4154;
/// Generation this writer produces.
pub const CURRENT_VERSION: u32 = 5;
/// Oldest generation this reader accepts.
pub const MIN_VERSION: u32 = 2;

/// One modality's dump, decoupled from the live index so the reader has no
/// opinion on ANN construction parameters.
pub struct LoadedModality {
    pub name: String,
    pub dim: usize,
    pub points: Vec<(u64, Vec<f32>)>,
}

/// Everything a file contained. The caller must rebuild the reverse index
/// before exposing the store.
pub struct LoadedStore {
    pub store: MetadataStore,
    pub modalities: Vec<LoadedModality>,
}

impl LoadedStore {
    fn empty() -> Self {
        Self {
            store: MetadataStore::new(),
            modalities: Vec::new(),
        }
    }
}

// ── Writing ──────────────────────────────────────────────────────────────────

/// Write the whole store in the current generation's layout.
pub fn save(
    path: &Path,
    store: &MetadataStore,
    modalities: &BTreeMap<String, VectorIndex>,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_store(&mut w, store, modalities)?;
    w.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    debug!(
        path = %path.display(),
        records = store.len(),
        modalities = modalities.len(),
        "store saved"
    );
    Ok(())
}

fn write_store<W: Write>(
    w: &mut W,
    store: &MetadataStore,
    modalities: &BTreeMap<String, VectorIndex>,
) -> Result<()> {
    w.write_u32::<LittleEndian>(MAGIC)?;
    w.write_u32::<LittleEndian>(CURRENT_VERSION)?;

    w.write_u32::<LittleEndian>(store.len() as u32)?;
    for (id, meta) in store.iter() {
        w.write_u64::<LittleEndian>(id)?;
        record::encode(w, meta)?;
    }

    w.write_u32::<LittleEndian>(modalities.len() as u32)?;
    for (name, index) in modalities {
        let name_bytes = name.as_bytes();
        w.write_u16::<LittleEndian>(name_bytes.len() as u16)?;
        w.write_all(name_bytes)?;
        w.write_u32::<LittleEndian>(index.dim() as u32)?;
        w.write_u32::<LittleEndian>(index.element_count() as u32)?;
        for (id, vector) in index.iter_points() {
            w.write_u64::<LittleEndian>(id)?;
            for &x in vector {
                w.write_f32::<LittleEndian>(x)?;
            }
        }
    }
    Ok(())
}

// ── Reading ──────────────────────────────────────────────────────────────────

/// Load a store file. Missing files and unrecognized content yield an empty
/// store; only an unreadable filesystem surfaces as an error.
pub fn load(path: &Path) -> Result<LoadedStore> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no store file, starting empty");
            return Ok(LoadedStore::empty());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open {}", path.display()))
        }
    };
    let mut r = BufReader::new(file);

    let (magic, version) = match read_envelope(&mut r) {
        Some(header) => header,
        None => return Ok(LoadedStore::empty()),
    };
    if magic != MAGIC || version < MIN_VERSION {
        warn!(
            path = %path.display(),
            magic, version,
            "unrecognized store header, starting empty"
        );
        return Ok(LoadedStore::empty());
    }

    let loaded = if version == 2 {
        read_v2(&mut r)
    } else {
        read_v3_plus(&mut r)
    };

    match loaded {
        Ok(loaded) => {
            if version < CURRENT_VERSION {
                info!(
                    path = %path.display(),
                    from = version,
                    to = CURRENT_VERSION,
                    "migrated legacy store in memory; next save rewrites it"
                );
            }
            Ok(loaded)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "truncated store file, starting empty");
            Ok(LoadedStore::empty())
        }
    }
}

fn read_envelope<R: Read>(r: &mut R) -> Option<(u32, u32)> {
    let magic = r.read_u32::<LittleEndian>().ok()?;
    let version = r.read_u32::<LittleEndian>().ok()?;
    Some((magic, version))
}

/// Generation 2: a single unnamed index, records interleaved with vectors.
/// Loads into a modality named "text".
fn read_v2<R: Read>(r: &mut R) -> std::io::Result<LoadedStore> {
    let dim = r.read_u32::<LittleEndian>()? as usize;
    let mut loaded = LoadedStore::empty();
    let mut points = Vec::new();

    loop {
        let id = match r.read_u64::<LittleEndian>() {
            Ok(id) => id,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        let meta = record::decode_v2(r)?;
        let mut vector = vec![0.0f32; dim];
        r.read_f32_into::<LittleEndian>(&mut vector)?;
        loaded.store.insert_raw(id, meta);
        points.push((id, vector));
    }

    loaded.modalities.push(LoadedModality {
        name: "text".to_string(),
        dim,
        points,
    });
    Ok(loaded)
}

/// Generations 3 and later: metadata section, then named modality sections.
fn read_v3_plus<R: Read>(r: &mut R) -> std::io::Result<LoadedStore> {
    let mut loaded = LoadedStore::empty();

    let meta_count = r.read_u32::<LittleEndian>()?;
    for _ in 0..meta_count {
        let id = r.read_u64::<LittleEndian>()?;
        let meta = record::decode(r)?;
        loaded.store.insert_raw(id, meta);
    }

    let modal_count = match r.read_u32::<LittleEndian>() {
        Ok(n) => n,
        // A file that ends after the metadata section still loads.
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(loaded),
        Err(e) => return Err(e),
    };
    for _ in 0..modal_count {
        let name_len = r.read_u16::<LittleEndian>()? as usize;
        let mut name_buf = vec![0u8; name_len];
        r.read_exact(&mut name_buf)?;
        let name = String::from_utf8_lossy(&name_buf).into_owned();

        let dim = r.read_u32::<LittleEndian>()? as usize;
        let element_count = r.read_u32::<LittleEndian>()?;
        let mut points = Vec::with_capacity(element_count as usize);
        for _ in 0..element_count {
            let id = r.read_u64::<LittleEndian>()?;
            let mut vector = vec![0.0f32; dim];
            r.read_f32_into::<LittleEndian>(&mut vector)?;
            points.push((id, vector));
        }
        loaded.modalities.push(LoadedModality { name, dim, points });
    }
    Ok(loaded)
}
