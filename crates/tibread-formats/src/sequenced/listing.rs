//! File listing records
//!
//! A listing names every file and directory of a slice by full path, in no
//! particular order. Each entry points at the file's metadata records through
//! an archive-relative offset.

use super::error::{SequencedError, SequencedResult};
use crate::source::{ByteSource, MemorySource, SourceReader, decode_utf16le};
use crate::time::Timestamp;
use binrw::BinRead;
use bytes::Bytes;

/// Attribute bit marking a directory
pub const ATTRIBUTE_DIRECTORY: u32 = 0x10;

const LOW_48_BITS: u64 = 0x0000_FFFF_FFFF_FFFF;

/// One file or directory of a slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Full path of the entry
    pub path: String,
    /// Attribute bits
    pub attributes: u32,
    /// Display name
    pub name: String,
    /// Short (8.3) name
    pub short_name: String,
    /// Modification time
    pub time: Timestamp,
    /// Logical size in bytes
    pub size: u64,
    /// Second size field; its meaning is unknown
    pub size2: u64,
    /// Archive-relative offset of the entry's first metadata record
    pub meta_offset: u64,
}

impl ListingEntry {
    /// Whether the entry is a directory
    pub const fn is_dir(&self) -> bool {
        self.attributes & ATTRIBUTE_DIRECTORY != 0
    }
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawListingEntry {
    path_len: u32,
    #[br(count = path_len as usize * 2)]
    path: Vec<u8>,
    attributes: u32,
    name_len: u32,
    #[br(count = name_len as usize * 2)]
    name: Vec<u8>,
    short_len: u32,
    #[br(count = short_len as usize * 2)]
    short_name: Vec<u8>,
    #[br(map = |t: u64| t & LOW_48_BITS, pad_after = 4)]
    time: u64,
    #[br(map = |s: u64| s & LOW_48_BITS)]
    size: u64,
    #[br(map = |s: u64| s & LOW_48_BITS)]
    size2: u64,
    #[br(map = |o: u64| o & LOW_48_BITS, pad_after = 38)]
    meta_offset: u64,
}

impl From<RawListingEntry> for ListingEntry {
    fn from(raw: RawListingEntry) -> Self {
        Self {
            path: decode_utf16le(&raw.path),
            attributes: raw.attributes,
            name: decode_utf16le(&raw.name),
            short_name: decode_utf16le(&raw.short_name),
            time: Timestamp::from_millis(raw.time),
            size: raw.size,
            size2: raw.size2,
            meta_offset: raw.meta_offset,
        }
    }
}

/// Decode a listing payload; entries must tile it exactly
pub fn parse_listing(payload: Bytes) -> SequencedResult<Vec<ListingEntry>> {
    let mut source = MemorySource::new(payload);
    let len = source.length()?;
    let declared = source.read_u32()?;

    let mut entries = Vec::with_capacity(declared.min(4096) as usize);
    while source.pos() < len {
        let raw = RawListingEntry::read(&mut SourceReader::new(&mut source))?;
        entries.push(ListingEntry::from(raw));
    }

    if source.pos() != len {
        return Err(SequencedError::Overrun {
            region: "listing",
            expected: len,
            actual: source.pos(),
        });
    }
    if entries.len() != declared as usize {
        return Err(SequencedError::CountMismatch {
            region: "listing record",
            declared,
            parsed: entries.len(),
        });
    }

    Ok(entries)
}
