//! File content reads
//!
//! Both dialects store a file as an ordered run of data blocks. A read walks
//! the blocks overlapping the requested range and copies the covered bytes;
//! a block shorter than the range it must supply is an error, never padded.

use crate::error::{ArchiveError, ArchiveResult};
use crate::volume::SidecarVolume;
use std::ops::Range;
use tibread_formats::sequenced::{Record, RecordBody, RecordHandle, RecordIndex, SequencedError};
use tibread_formats::sidecar::{BoxHandle, SidecarError};
use tibread_formats::{ByteSource, Diagnostics};
use tracing::trace;

/// Byte range of a read, truncated to the file size
pub(crate) fn clamp(position: u64, length: u64, size: u64) -> Range<u64> {
    let start = position.min(size);
    start..position.saturating_add(length).min(size)
}

/// Largest buffer reserved before any block has been read
///
/// File sizes are read from the archive; the output grows with the data
/// actually found.
const INITIAL_CAPACITY: u64 = 1 << 20;

/// Accumulates the covered part of a range from consecutive blocks
struct Assembler {
    range: Range<u64>,
    out: Vec<u8>,
}

impl Assembler {
    fn new(range: Range<u64>) -> Self {
        let capacity = (range.end - range.start).min(INITIAL_CAPACITY) as usize;
        Self {
            range,
            out: Vec::with_capacity(capacity),
        }
    }

    fn cursor(&self) -> u64 {
        self.range.start + self.out.len() as u64
    }

    fn done(&self) -> bool {
        self.cursor() >= self.range.end
    }

    /// Whether the block `[start, end)` overlaps what is still missing
    fn wants(&self, start: u64, end: u64) -> bool {
        end > self.cursor() && start < self.range.end
    }

    /// Copy the wanted part of a block that starts at `block_start`
    fn take(&mut self, block_start: u64, block_end: u64, data: &[u8]) -> ArchiveResult<()> {
        let cursor = self.cursor();
        if block_start > cursor {
            return Err(ArchiveError::IncompleteContent {
                covered: cursor,
                size: self.range.end,
            });
        }
        let from = cursor - block_start;
        let to = block_end.min(self.range.end) - block_start;
        if (data.len() as u64) < to {
            return Err(ArchiveError::ShortBlob {
                expected: to,
                actual: data.len() as u64,
            });
        }
        self.out.extend_from_slice(&data[from as usize..to as usize]);
        Ok(())
    }

    fn finish(self) -> ArchiveResult<Vec<u8>> {
        if !self.done() {
            return Err(ArchiveError::IncompleteContent {
                covered: self.cursor(),
                size: self.range.end,
            });
        }
        Ok(self.out)
    }
}

/// Read a dialect A file through its blob handles
pub(crate) fn read_boxes(
    volume: &SidecarVolume,
    handles: &[BoxHandle],
    range: Range<u64>,
    diag: &mut Diagnostics,
) -> ArchiveResult<Vec<u8>> {
    let mut assembler = Assembler::new(range);
    let mut block_start = 0u64;

    for handle in handles {
        if assembler.done() {
            break;
        }
        let block_end = block_start + u64::from(handle.size);
        if assembler.wants(block_start, block_end) {
            let found = volume.read_box_handle(handle, diag)?;
            let data = found
                .blob()
                .ok_or(SidecarError::NotABlob {
                    offset: found.start,
                })?;
            assembler.take(block_start, block_end, data)?;
        }
        block_start = block_end;
    }

    assembler.finish()
}

/// Walk a file's metadata records up to its record index
fn find_index(source: &mut dyn ByteSource, meta_offset: u64) -> ArchiveResult<RecordIndex> {
    let len = source.length()?;
    source.seek(meta_offset);
    while source.pos() < len {
        let record = Record::read(source)?;
        match record.body {
            RecordBody::Index(index) => return Ok(index),
            RecordBody::EndTrailer => break,
            _ => {}
        }
    }
    Err(SequencedError::MissingIndex {
        offset: meta_offset,
    }
    .into())
}

/// Read a dialect B file through its record index
///
/// `source` addresses the whole archive.
pub(crate) fn read_records(
    source: &mut dyn ByteSource,
    meta_offset: u64,
    size: u64,
    range: Range<u64>,
    verify: bool,
) -> ArchiveResult<Vec<u8>> {
    if range.is_empty() {
        return Ok(Vec::new());
    }

    let index = find_index(source, meta_offset)?;
    let handles: Vec<RecordHandle> = index.handles_by_start();
    let total = index.total_size.max(size);
    let mut assembler = Assembler::new(range);

    for (i, handle) in handles.iter().enumerate() {
        if assembler.done() {
            break;
        }
        let block_start = handle.start_offset;
        let block_end = handles.get(i + 1).map_or(total, |next| next.start_offset);
        if !assembler.wants(block_start, block_end) {
            continue;
        }

        source.seek(handle.record_offset);
        let record = Record::read(source)?;
        let data = record.blob().ok_or(SequencedError::UnexpectedRecord {
            offset: handle.record_offset,
            expected: "blob",
            found: record.kind.tag(),
        })?;
        if verify && !handle.verify(data) {
            return Err(ArchiveError::BlockHash {
                record_offset: handle.record_offset,
                expected: handle.md5_hex(),
            });
        }
        trace!(
            "Block {}..{} from record at {}",
            block_start, block_end, handle.record_offset
        );
        assembler.take(block_start, block_end, data)?;
    }

    assembler.finish()
}
