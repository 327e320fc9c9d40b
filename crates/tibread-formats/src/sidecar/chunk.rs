//! Decompressed record payloads

use super::boxes::ChunkBox;
use super::error::{SidecarError, SidecarResult};
use crate::diagnostics::Diagnostics;
use crate::source::{ByteSource, MemorySource};
use bytes::Bytes;

/// Decompressed body of one record
///
/// Starts with a u32 length covering the rest of the data, followed by a run
/// of boxes tiling `[inner_start, inner_end)`. Offsets are relative to the
/// start of the decompressed data.
#[derive(Debug, Clone)]
pub struct Chunk {
    data: Bytes,
    /// First box offset
    pub inner_start: u64,
    /// End of the last box
    pub inner_end: u64,
}

impl Chunk {
    /// Frame decompressed record data
    ///
    /// A record only ever holds a single chunk, so the length prefix must
    /// cover all of it.
    pub fn parse(data: Bytes) -> SidecarResult<Self> {
        let mut source = MemorySource::new(data.clone());
        let declared = 4 + u64::from(source.read_u32()?);
        let actual = data.len() as u64;
        if declared != actual {
            return Err(SidecarError::ChunkSize { declared, actual });
        }

        Ok(Self {
            data,
            inner_start: 4,
            inner_end: declared,
        })
    }

    /// Whole decompressed data, including the length prefix
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Fresh source over the chunk data
    pub fn source(&self) -> MemorySource {
        MemorySource::new(self.data.clone())
    }

    /// Decode every box; they must end exactly at `inner_end`
    pub fn read_all_boxes(&self, diag: &mut Diagnostics) -> SidecarResult<Vec<ChunkBox>> {
        let mut source = self.source();
        source.seek(self.inner_start);

        let mut boxes = Vec::new();
        while source.pos() < self.inner_end {
            boxes.push(ChunkBox::read(&mut source, diag)?);
        }

        if source.pos() != self.inner_end {
            return Err(SidecarError::Overrun {
                region: "chunk",
                expected: self.inner_end,
                actual: source.pos(),
            });
        }

        Ok(boxes)
    }

    /// Decode the single box whose header starts at `offset`
    pub fn read_box_at(&self, offset: u64, diag: &mut Diagnostics) -> SidecarResult<ChunkBox> {
        let mut source = self.source();
        source.seek(offset);
        ChunkBox::read(&mut source, diag)
    }
}
