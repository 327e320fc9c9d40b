//! Builders for synthetic archives on disk
//!
//! Both builders write real volume files into a directory: headers with
//! valid checksums, compressed records laid out the way the decoders expect,
//! and the metadata that points back at them.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tibread_formats::VOLUME_MAGIC;
use tibread_formats::checksum::header_checksum;

pub const ARCHIVE_KEY: [u8; 4] = [0x10, 0x20, 0x30, 0x40];
pub const CREATED_MS: u64 = 1_650_000_000_000;

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn put_u24(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
}

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Volume header with a valid checksum
pub fn volume_header(
    dialect_tag: u16,
    header_len: u16,
    block_size: u32,
    sequence: u32,
    archive_key: [u8; 4],
) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&VOLUME_MAGIC.to_le_bytes());
    header.extend_from_slice(&header_len.to_le_bytes());
    header.extend_from_slice(&dialect_tag.to_le_bytes());
    header.extend_from_slice(&archive_key);
    header.extend_from_slice(&[0x22; 4]);
    header.extend_from_slice(&[0x33; 4]);
    header.extend_from_slice(&sequence.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&block_size.to_le_bytes());
    header.resize(header_len as usize, 0);
    let sum = header_checksum(&header);
    header[0x18..0x1C].copy_from_slice(&sum.to_le_bytes());
    header
}

/// Patch header fields of a written volume and fix up its checksum
pub fn rewrite_header(path: &Path, sequence: Option<u32>, archive_key: Option<[u8; 4]>) {
    let mut bytes = fs::read(path).unwrap();
    let header_len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
    if let Some(sequence) = sequence {
        bytes[0x14..0x18].copy_from_slice(&sequence.to_le_bytes());
    }
    if let Some(key) = archive_key {
        bytes[0x08..0x0C].copy_from_slice(&key);
    }
    let sum = header_checksum(&bytes[..header_len]);
    bytes[0x18..0x1C].copy_from_slice(&sum.to_le_bytes());
    fs::write(path, bytes).unwrap();
}

// ---------------------------------------------------------------------------
// Dialect A
// ---------------------------------------------------------------------------

const SIDECAR_BLOCK: usize = 4096;
const META_BLOCK: usize = 128;

/// One slice of a dialect A archive
#[derive(Debug, Clone, Default)]
pub struct SidecarSlice {
    /// `/`-separated paths below the root and their contents
    pub files: Vec<(String, Vec<u8>)>,
    /// Directories without files
    pub dirs: Vec<String>,
    pub xml: String,
}

impl SidecarSlice {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, data)| ((*path).to_string(), data.to_vec()))
                .collect(),
            dirs: Vec::new(),
            xml: "<?xml version=\"1.0\"?><config/>".to_string(),
        }
    }
}

/// Layout knobs for dialect A volumes
#[derive(Debug, Clone, Copy)]
pub struct SidecarLayout {
    /// Bytes of file data per blob box
    pub blob_len: usize,
    /// Blob boxes per container record
    pub boxes_per_record: usize,
}

impl Default for SidecarLayout {
    fn default() -> Self {
        Self {
            blob_len: 1024,
            boxes_per_record: 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Handle {
    record_start: u64,
    start: u32,
    size: u32,
    record_size: u32,
}

enum Draft {
    Dir(BTreeMap<String, Draft>),
    File(usize),
}

struct FlatEntry {
    name: String,
    raw_type: u8,
    size: u64,
    num_entries: u32,
    file: Option<usize>,
}

fn insert(dir: &mut BTreeMap<String, Draft>, parts: &[&str], file: Option<usize>) {
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() {
        let node = file.map_or_else(|| Draft::Dir(BTreeMap::new()), Draft::File);
        dir.entry((*first).to_string()).or_insert(node);
        return;
    }
    let child = dir
        .entry((*first).to_string())
        .or_insert_with(|| Draft::Dir(BTreeMap::new()));
    if let Draft::Dir(children) = child {
        insert(children, rest, file);
    }
}

/// Flatten to pre-order; returns the number of entries written
fn flatten(
    name: &str,
    node: &Draft,
    raw_type: u8,
    sizes: &[u64],
    out: &mut Vec<FlatEntry>,
) -> u32 {
    match node {
        Draft::File(index) => {
            out.push(FlatEntry {
                name: name.to_string(),
                raw_type: 0,
                size: sizes[*index],
                num_entries: 0,
                file: Some(*index),
            });
            1
        }
        Draft::Dir(children) => {
            let at = out.len();
            out.push(FlatEntry {
                name: name.to_string(),
                raw_type,
                size: 0,
                num_entries: 0,
                file: None,
            });
            let nested: u32 = children
                .iter()
                .map(|(child, node)| flatten(child, node, 128, sizes, out))
                .sum();
            out[at].num_entries = nested;
            nested + 1
        }
    }
}

/// Encoded file entry
fn entry_bytes(entry: &FlatEntry, handles: &[Handle]) -> Vec<u8> {
    let units = entry.name.encode_utf16().count();

    let mut rest = vec![0u8; 8];
    rest.extend_from_slice(&0u16.to_le_bytes());
    rest.extend_from_slice(&(units as u16).to_le_bytes());
    rest.extend_from_slice(&[0u8; 2]);
    rest.push(entry.raw_type);
    rest.extend_from_slice(&[0u8; 3]);
    rest.extend_from_slice(&entry.size.to_le_bytes());
    rest.extend_from_slice(&[0u8; 8]);
    rest.extend_from_slice(&CREATED_MS.to_le_bytes());
    rest.extend_from_slice(&(CREATED_MS + 1).to_le_bytes());
    rest.extend_from_slice(&[0u8; 4]);
    rest.extend(utf16(&entry.name));

    let gap = match entry.raw_type {
        131 => 41,
        128 => 85,
        _ => 35,
    };
    let mut tail = vec![0u8; gap];
    if entry.raw_type == 128 {
        tail[45..49].copy_from_slice(&entry.num_entries.to_le_bytes());
    }
    rest.extend(tail);

    let mut groups = Vec::new();
    if !handles.is_empty() {
        groups.extend_from_slice(&0x0104u32.to_le_bytes());
        groups.extend_from_slice(&((handles.len() * 20) as u32).to_le_bytes());
        for handle in handles {
            groups.extend_from_slice(&handle.record_start.to_le_bytes());
            groups.extend_from_slice(&handle.start.to_le_bytes());
            groups.extend_from_slice(&handle.size.to_le_bytes());
            groups.extend_from_slice(&handle.record_size.to_le_bytes());
        }
        groups.extend_from_slice(&[0u8; 4]);
    }
    rest.extend_from_slice(&(groups.len() as u32).to_le_bytes());
    rest.extend(groups);
    // A root's entry count sits in the closing word
    if entry.raw_type == 131 {
        rest.extend_from_slice(&entry.num_entries.to_le_bytes());
    } else {
        rest.extend_from_slice(&[0u8; 4]);
    }

    let mut out = 4u32.to_le_bytes().to_vec();
    out.extend_from_slice(&[0xAB; 4]);
    out.extend_from_slice(&((rest.len() + 4) as u32).to_le_bytes());
    out.extend(rest);
    out
}

fn blob_box(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xB0];
    put_u24(&mut out, 2 + 3 + payload.len());
    out.extend_from_slice(&0x04C0u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 3]);
    out.extend_from_slice(payload);
    out
}

/// Container record padded so that `prefix + record` fills whole blocks
fn container_record(flags: u8, chunk_boxes: &[u8], prefix: usize, align: usize) -> Vec<u8> {
    let mut chunk = (chunk_boxes.len() as u32).to_le_bytes().to_vec();
    chunk.extend_from_slice(chunk_boxes);
    let body = zlib(&chunk);

    let total = (prefix + 8 + body.len()).div_ceil(align) * align - prefix;
    let mut out = vec![flags];
    put_u24(&mut out, total - 4);
    out.extend(body);
    out.resize(total - 4, 0);
    out.push(0x78);
    put_u24(&mut out, total - 4);
    out
}

fn metadata_box(slice_id: [u8; 16], xml: &str, entries: &[u8]) -> Vec<u8> {
    let mut inner = vec![0u8; 53];
    inner.extend_from_slice(&slice_id);
    inner.extend_from_slice(&CREATED_MS.to_le_bytes());
    inner.resize(inner.len() + 40, 0);

    let mut xml_bytes = vec![0xFF, 0xFE];
    xml_bytes.extend(utf16(xml));
    inner.extend_from_slice(&(xml_bytes.len() as u16).to_le_bytes());
    inner.extend(xml_bytes);
    inner.extend_from_slice(&[0u8; 8]);
    inner.extend_from_slice(entries);
    inner.extend_from_slice(&[0u8; 3]);

    let mut body = Vec::new();
    put_u24(&mut body, inner.len());
    body.extend(inner);

    let mut out = vec![0xB0];
    put_u24(&mut out, 2 + body.len());
    out.extend_from_slice(&0x0040u16.to_le_bytes());
    out.extend(body);
    out
}

/// Packs blob boxes into records of the data volume
struct DataWriter {
    layout: SidecarLayout,
    data: Vec<u8>,
    pending: Vec<u8>,
    /// (file, box offset in chunk, payload size)
    pending_boxes: Vec<(usize, usize, usize)>,
    handles: Vec<Vec<Handle>>,
}

impl DataWriter {
    fn push(&mut self, file: usize, payload: &[u8]) {
        // Box offsets are relative to the decompressed chunk, after its length
        let offset = 4 + self.pending.len();
        self.pending.extend(blob_box(payload));
        self.pending_boxes.push((file, offset, payload.len()));
        if self.pending_boxes.len() == self.layout.boxes_per_record {
            self.seal();
        }
    }

    fn seal(&mut self) {
        if self.pending_boxes.is_empty() {
            return;
        }
        let record = container_record(0x98, &self.pending, 0, SIDECAR_BLOCK);
        let record_start = self.data.len() as u64;
        for (file, offset, size) in self.pending_boxes.drain(..) {
            self.handles[file].push(Handle {
                record_start,
                start: offset as u32 + 5,
                size: size as u32,
                record_size: record.len() as u32,
            });
        }
        self.data.extend(record);
        self.pending.clear();
    }
}

/// Write `<dir>/<name>.tib` and its sidecar; returns the volume path
pub fn write_sidecar_archive(
    dir: &Path,
    name: &str,
    slices: &[SidecarSlice],
    layout: SidecarLayout,
) -> PathBuf {
    let mut sidecar = Vec::new();
    // Header record, skipped by readers
    let mut prefix = vec![0x77, 0x14];
    prefix.resize(16, 0);
    sidecar.extend_from_slice(&prefix);
    sidecar.extend(container_record(0x80, &[], 16, META_BLOCK));

    let mut writer = DataWriter {
        layout,
        data: Vec::new(),
        pending: Vec::new(),
        pending_boxes: Vec::new(),
        handles: Vec::new(),
    };

    for (slice_index, slice) in slices.iter().enumerate() {
        let mut root = BTreeMap::new();
        let first_file = writer.handles.len();
        let mut sizes = Vec::new();
        for (offset, (path, data)) in slice.files.iter().enumerate() {
            let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
            insert(&mut root, &parts, Some(offset));
            sizes.push(data.len() as u64);
            writer.handles.push(Vec::new());
            for piece in data.chunks(layout.blob_len) {
                writer.push(first_file + offset, piece);
            }
        }
        for path in &slice.dirs {
            let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
            insert(&mut root, &parts, None);
        }
        writer.seal();

        let mut flat = Vec::new();
        flatten("root:", &Draft::Dir(root), 131, &sizes, &mut flat);
        let entries: Vec<u8> = flat
            .iter()
            .flat_map(|entry| {
                let handles = entry
                    .file
                    .map_or(&[][..], |f| &writer.handles[first_file + f][..]);
                entry_bytes(entry, handles)
            })
            .collect();

        let slice_id = [slice_index as u8 + 1; 16];
        let meta = metadata_box(slice_id, &slice.xml, &entries);
        sidecar.extend_from_slice(&prefix);
        sidecar.extend(container_record(0x88, &meta, 16, META_BLOCK));
    }

    let mut volume = volume_header(1, 0x24, SIDECAR_BLOCK as u32, 1, ARCHIVE_KEY);
    volume.resize(3 * SIDECAR_BLOCK, 0);
    volume.extend(writer.data);

    let path = dir.join(format!("{name}.tib"));
    fs::write(&path, volume).unwrap();
    let mut meta_path = path.clone().into_os_string();
    meta_path.push(".metadata");
    fs::write(PathBuf::from(meta_path), sidecar).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Dialect B
// ---------------------------------------------------------------------------

/// Encode a dialect B record
pub fn record_bytes(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match tag {
        104 => {}
        108..=110 => out.extend(zlib(payload)),
        _ => {
            out.extend(deflate(payload));
            out.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        }
    }
    out
}

fn config_payload(pairs: &[(String, String)]) -> Vec<u8> {
    let mut out = vec![0u8; 165];
    out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
    for (key, value) in pairs {
        out.extend_from_slice(&(key.encode_utf16().count() as u32).to_le_bytes());
        out.extend(utf16(key));
        // Values carry a byte order mark
        out.extend_from_slice(&(value.encode_utf16().count() as u32 + 1).to_le_bytes());
        out.extend_from_slice(&[0xFF, 0xFE]);
        out.extend(utf16(value));
    }
    out.push(0);
    out
}

fn listing_entry(path: &str, attributes: u32, size: u64, meta_offset: u64) -> Vec<u8> {
    let name = path.rsplit('\\').next().unwrap_or(path);
    let mut out = Vec::new();
    for (text, attrs) in [(path, Some(attributes)), (name, None), ("", None)] {
        out.extend_from_slice(&(text.encode_utf16().count() as u32).to_le_bytes());
        out.extend(utf16(text));
        if let Some(attrs) = attrs {
            out.extend_from_slice(&attrs.to_le_bytes());
        }
    }
    out.extend_from_slice(&CREATED_MS.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&meta_offset.to_le_bytes());
    out.extend_from_slice(&[0u8; 38]);
    out
}

fn index_payload(total: u64, handles: &[(u64, u64, [u8; 16])]) -> Vec<u8> {
    let mut out = vec![0x01, 0x02, 0x00, 0x10, 0x01, 0x00, 0x00, 0x00];
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(&(handles.len() as u32).to_le_bytes());
    for (start, record, digest) in handles {
        out.extend_from_slice(&start.to_le_bytes());
        out.extend_from_slice(&record.to_le_bytes());
        out.extend_from_slice(digest);
    }
    out.extend_from_slice(&[0u8; 16]);
    out
}

/// One slice of a dialect B archive
#[derive(Debug, Clone)]
pub struct SequencedSlice {
    /// Backslash-separated paths and their contents
    pub files: Vec<(String, Vec<u8>)>,
    /// Directories, listed explicitly
    pub dirs: Vec<String>,
    pub config: Vec<(String, String)>,
    /// Volumes the slice is split across
    pub volumes: usize,
    /// Trailer form; 0 is file-level
    pub form: u32,
    /// Bytes of file data per blob record
    pub block_len: usize,
    /// Store wrong digests in the record indexes
    pub corrupt_hashes: bool,
    /// Size written to the listing for every file instead of its length
    pub listed_size: Option<u64>,
}

impl SequencedSlice {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, data)| ((*path).to_string(), data.to_vec()))
                .collect(),
            dirs: Vec::new(),
            config: vec![("archive".to_string(), "<?xml?><archive/>".to_string())],
            volumes: 1,
            form: 0,
            block_len: 64,
            corrupt_hashes: false,
            listed_size: None,
        }
    }
}

/// Slice data addressed from archive offset `base`
fn slice_stream(base: u64, index: usize, slice: &SequencedSlice) -> (Vec<u8>, u64) {
    let mut out = Vec::new();
    let mut listing = Vec::new();
    for dir in &slice.dirs {
        listing.push(listing_entry(dir, 0x10, 0, 0));
    }

    for (path, data) in &slice.files {
        let mut handles = Vec::new();
        for (block, piece) in data.chunks(slice.block_len).enumerate() {
            let record_offset = base + out.len() as u64;
            out.extend(record_bytes(109, piece));
            let mut digest = md5::compute(piece).0;
            if slice.corrupt_hashes {
                digest[0] ^= 0xFF;
            }
            handles.push(((block * slice.block_len) as u64, record_offset, digest));
        }
        // Stored order is not block order
        handles.reverse();

        let meta_offset = base + out.len() as u64;
        out.extend(record_bytes(102, b"per-file metadata"));
        out.extend(record_bytes(108, &index_payload(data.len() as u64, &handles)));
        let size = slice.listed_size.unwrap_or(data.len() as u64);
        listing.push(listing_entry(path, 0x20, size, meta_offset));
    }

    let metadata_offset = base + out.len() as u64;
    out.extend(record_bytes(101, &config_payload(&slice.config)));
    let mut listing_payload = (listing.len() as u32).to_le_bytes().to_vec();
    listing_payload.extend(listing.concat());
    out.extend(record_bytes(103, &listing_payload));

    let trailer_offset = base + out.len() as u64;
    out.extend(record_bytes(104, &[]));
    out.extend_from_slice(&slice.form.to_le_bytes());
    out.extend_from_slice(&[index as u8 + 1; 16]);
    out.extend_from_slice(&CREATED_MS.to_le_bytes());
    out.extend_from_slice(&metadata_offset.to_le_bytes());

    (out, trailer_offset)
}

/// Write every volume of a dialect B archive; returns paths in sequence order
pub fn write_sequenced_archive(dir: &Path, name: &str, slices: &[SequencedSlice]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut base = 0u64;
    let mut sequence = 1u32;

    for (index, slice) in slices.iter().enumerate() {
        let (stream, trailer_offset) = slice_stream(base, index, slice);
        let strategy = if index == 0 { "full" } else { "inc" };
        let volumes = slice.volumes.max(1);

        for part in 0..volumes {
            let from = stream.len() * part / volumes;
            let to = stream.len() * (part + 1) / volumes;
            let mut file = volume_header(0, 0x20, 32, sequence, ARCHIVE_KEY);
            file.extend_from_slice(&stream[from..to]);
            if part + 1 == volumes {
                file.extend_from_slice(&(stream.len() as u64).to_le_bytes());
                file.extend_from_slice(&trailer_offset.to_le_bytes());
            }

            let path = dir.join(format!(
                "{name}_{strategy}_b1_s{}_v{}.tib",
                index + 1,
                part + 1
            ));
            fs::write(&path, file).unwrap();
            paths.push(path);
            sequence += 1;
        }
        base += stream.len() as u64;
    }
    paths
}

/// Deterministic test data
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
