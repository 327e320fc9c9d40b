//! Record indexes: where a file's data blocks live
//!
//! ```text
//! [magic 01 02 00 10 01 00 00 00][total_size u64][count u32]
//! {[start_offset u64][record_offset u64][md5 16]}*
//! [opaque tail]
//! ```

use super::error::{SequencedError, SequencedResult};
use crate::source::{ByteSource, MemorySource, SourceReader};
use binrw::BinRead;
use bytes::Bytes;

/// Leading bytes of every record index payload
pub const RECORD_INDEX_MAGIC: [u8; 8] = [0x01, 0x02, 0x00, 0x10, 0x01, 0x00, 0x00, 0x00];

const LOW_48_BITS: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Encoded size of one [`RecordHandle`]
const HANDLE_LEN: u64 = 32;

/// Bytes of `total_size` and `count` after the magic
const COUNTS_LEN: u64 = 12;

/// Location of one data block of a file
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct RecordHandle {
    /// Offset of the block within the file's data
    #[br(map = |o: u64| o & LOW_48_BITS)]
    pub start_offset: u64,
    /// Archive-relative offset of the blob record holding the block
    #[br(map = |o: u64| o & LOW_48_BITS)]
    pub record_offset: u64,
    /// MD5 of the decompressed block
    pub md5: [u8; 16],
}

impl RecordHandle {
    /// Whether `block` hashes to the stored digest
    pub fn verify(&self, block: &[u8]) -> bool {
        md5::compute(block).0 == self.md5
    }

    /// Stored digest as lowercase hex
    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5)
    }
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawIndex {
    #[br(map = |s: u64| s & LOW_48_BITS)]
    total_size: u64,
    count: u32,
    #[br(count = count)]
    handles: Vec<RecordHandle>,
}

/// Decoded record index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIndex {
    /// Uncompressed size of all indexed blocks; matches the file size
    pub total_size: u64,
    /// Block handles in stored order
    pub handles: Vec<RecordHandle>,
}

impl RecordIndex {
    /// Decode an index payload; bytes after the handles are ignored
    pub fn parse(payload: Bytes) -> SequencedResult<Self> {
        let mut source = MemorySource::new(payload);
        let mut magic = [0u8; 8];
        source.read_exact_into(&mut magic)?;
        if magic != RECORD_INDEX_MAGIC {
            return Err(SequencedError::IndexMagic(magic));
        }

        // The handle table must fit in the payload
        let counts_at = source.pos();
        source.seek(counts_at + 8);
        let declared = source.read_u32()?;
        let table_end = counts_at + COUNTS_LEN + u64::from(declared) * HANDLE_LEN;
        let len = source.length()?;
        if table_end > len {
            return Err(SequencedError::Overrun {
                region: "record index",
                expected: len,
                actual: table_end,
            });
        }
        source.seek(counts_at);

        let raw = RawIndex::read(&mut SourceReader::new(&mut source))?;
        Ok(Self {
            total_size: raw.total_size,
            handles: raw.handles,
        })
    }

    /// Handles sorted by their offset in the file's data
    pub fn handles_by_start(&self) -> Vec<RecordHandle> {
        let mut sorted = self.handles.clone();
        sorted.sort_by_key(|h| h.start_offset);
        sorted
    }
}
