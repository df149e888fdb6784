//! Per-record binary encoding.
//!
//! Little-endian, packed, length-prefixed fields in a fixed order. The record
//! layout has grown by appending sections across format generations; the
//! decoder therefore tolerates end-of-stream at each generation boundary and
//! returns the fields read so far, which is what lets one reader accept every
//! supported generation:
//!
//! - base: timestamp, importance, type tag, source, content, tags_json
//! - legacy links slot: plain u64 target ids, promoted on read to typed edges
//!   (`related_to`, weight 1.0); current writers always emit a zero count
//! - salience: recall_count, last_recalled_at
//! - partitions: namespace_id, entity_id, attributes
//! - typed edges: target, rel_type (u8 length, clamped to 255 bytes), weight

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, ErrorKind, Read, Write};

use crate::memory::types::{ContextType, Edge, Metadata};

use crate::memory::types::rel_type::RELATED_TO;

// Write-time clamps, in bytes. Decoding is lossy-UTF-8, so a clamp landing
// mid-codepoint is backed off to the nearest char boundary.
const MAX_U8_STR: usize = u8::MAX as usize;
const MAX_U16_STR: usize = u16::MAX as usize;

fn clamp_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn write_str_u16<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let s = clamp_str(s, MAX_U16_STR);
    w.write_u16::<LittleEndian>(s.len() as u16)?;
    w.write_all(s.as_bytes())
}

fn write_str_u32<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

fn read_exact_string<R: Read>(r: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_str_u16<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u16::<LittleEndian>()? as usize;
    read_exact_string(r, len)
}

fn read_str_u32<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    read_exact_string(r, len)
}

/// Serialize one record in the current generation's layout.
pub fn encode<W: Write>(w: &mut W, meta: &Metadata) -> io::Result<()> {
    w.write_i64::<LittleEndian>(meta.timestamp)?;
    w.write_f32::<LittleEndian>(meta.importance)?;
    w.write_u8(meta.context_type.as_u8())?;

    write_str_u16(w, &meta.source)?;
    write_str_u32(w, &meta.content)?;
    write_str_u16(w, &meta.tags_json)?;

    // Legacy links slot: always zero, so prior-generation readers see no
    // plain links and keep going.
    w.write_u16::<LittleEndian>(0)?;

    w.write_u32::<LittleEndian>(meta.recall_count)?;
    w.write_u64::<LittleEndian>(meta.last_recalled_at)?;

    write_str_u16(w, &meta.namespace_id)?;
    write_str_u16(w, &meta.entity_id)?;

    w.write_u16::<LittleEndian>(meta.attributes.len().min(MAX_U16_STR) as u16)?;
    for (key, val) in meta.attributes.iter().take(MAX_U16_STR) {
        write_str_u16(w, key)?;
        write_str_u32(w, val)?;
    }

    w.write_u16::<LittleEndian>(meta.edges.len().min(MAX_U16_STR) as u16)?;
    for e in meta.edges.iter().take(MAX_U16_STR) {
        w.write_u64::<LittleEndian>(e.target_id)?;
        let rt = clamp_str(&e.rel_type, MAX_U8_STR);
        w.write_u8(rt.len() as u8)?;
        w.write_all(rt.as_bytes())?;
        w.write_f32::<LittleEndian>(e.weight)?;
    }

    Ok(())
}

/// Shorthand for `Ok(partial)` when a tail section is absent, `Err` otherwise.
macro_rules! or_return_partial {
    ($expr:expr, $meta:ident) => {
        match $expr {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok($meta),
            Err(e) => return Err(e),
        }
    };
}

/// Deserialize one record, accepting every supported generation. Sections
/// missing from older files leave their fields at the defaults.
pub fn decode<R: Read>(r: &mut R) -> io::Result<Metadata> {
    let mut meta = Metadata::default();

    meta.timestamp = r.read_i64::<LittleEndian>()?;
    meta.importance = r.read_f32::<LittleEndian>()?;
    meta.context_type = ContextType::from_u8(r.read_u8()?);

    meta.source = read_str_u16(r)?;
    meta.content = read_str_u32(r)?;
    meta.tags_json = read_str_u16(r)?;

    // Legacy links slot. A non-zero count means a v3/v4 record: promote each
    // plain target id to a typed edge with the default relationship.
    let links_count = or_return_partial!(r.read_u16::<LittleEndian>(), meta);
    for _ in 0..links_count {
        let target_id = r.read_u64::<LittleEndian>()?;
        meta.edges.push(Edge::new(target_id, RELATED_TO, 1.0));
    }

    meta.recall_count = r.read_u32::<LittleEndian>()?;
    meta.last_recalled_at = r.read_u64::<LittleEndian>()?;

    meta.namespace_id = or_return_partial!(read_str_u16(r), meta);
    meta.entity_id = read_str_u16(r)?;
    let attr_count = r.read_u16::<LittleEndian>()?;
    for _ in 0..attr_count {
        let key = read_str_u16(r)?;
        let val = read_str_u32(r)?;
        meta.attributes.insert(key, val);
    }

    let edge_count = or_return_partial!(r.read_u16::<LittleEndian>(), meta);
    for _ in 0..edge_count {
        let target_id = r.read_u64::<LittleEndian>()?;
        let rt_len = r.read_u8()? as usize;
        let rel_type = read_exact_string(r, rt_len)?;
        let weight = r.read_f32::<LittleEndian>()?;
        meta.edges.push(Edge {
            target_id,
            rel_type,
            weight,
        });
    }

    Ok(meta)
}

/// Deserialize a v2-era record. v2 interleaves records with their vectors,
/// so this reads exactly the sections that generation wrote (base, links
/// slot, salience) and stops; the open-ended tail tolerance of [`decode`]
/// would consume vector bytes.
pub fn decode_v2<R: Read>(r: &mut R) -> io::Result<Metadata> {
    let mut meta = Metadata::default();

    meta.timestamp = r.read_i64::<LittleEndian>()?;
    meta.importance = r.read_f32::<LittleEndian>()?;
    meta.context_type = ContextType::from_u8(r.read_u8()?);

    meta.source = read_str_u16(r)?;
    meta.content = read_str_u32(r)?;
    meta.tags_json = read_str_u16(r)?;

    let links_count = r.read_u16::<LittleEndian>()?;
    for _ in 0..links_count {
        let target_id = r.read_u64::<LittleEndian>()?;
        meta.edges.push(Edge::new(target_id, RELATED_TO, 1.0));
    }

    meta.recall_count = r.read_u32::<LittleEndian>()?;
    meta.last_recalled_at = r.read_u64::<LittleEndian>()?;

    Ok(meta)
}
