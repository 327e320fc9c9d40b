//! Dialect A data volumes
//!
//! Data starts three blocks into the file. Box handles address records
//! relative to that offset.

use super::VolumeFile;
use crate::error::ArchiveResult;
use parking_lot::Mutex;
use tibread_formats::sidecar::{BoxHandle, Chunk, ChunkBox, ContainerRecord, SidecarError};
use tibread_formats::{ByteSource, Diagnostics, FileSource, Warning};
use tracing::{debug, trace};

/// Most recently decompressed chunk
#[derive(Debug)]
struct CachedChunk {
    record_start: u64,
    chunk: Chunk,
}

/// Single data volume of a dialect A archive
#[derive(Debug)]
pub struct SidecarVolume {
    pub(crate) file: VolumeFile,
    cache: Option<Mutex<Option<CachedChunk>>>,
}

impl SidecarVolume {
    pub(crate) fn new(file: VolumeFile, chunk_cache: bool) -> Self {
        Self {
            file,
            cache: chunk_cache.then(|| Mutex::new(None)),
        }
    }

    /// Offset of the first record
    pub fn data_start(&self) -> u64 {
        self.file.data_start()
    }

    fn block_size(&self) -> u32 {
        self.file.header.block_size
    }

    /// Fresh, independently positioned view of the whole file
    fn view(&self) -> ArchiveResult<FileSource> {
        Ok(self.file.source.sub_source(None, None)?)
    }

    /// Decode the box a handle points at, without scanning the volume
    pub fn read_box_handle(
        &self,
        handle: &BoxHandle,
        diag: &mut Diagnostics,
    ) -> ArchiveResult<ChunkBox> {
        let chunk = self.chunk_at(handle, diag)?;
        Ok(chunk.read_box_at(handle.box_offset()?, diag)?)
    }

    fn chunk_at(&self, handle: &BoxHandle, diag: &mut Diagnostics) -> ArchiveResult<Chunk> {
        let record_start = self.data_start() + handle.record_start;

        if let Some(cache) = &self.cache {
            let cached = cache.lock();
            if let Some(hit) = cached.as_ref()
                && hit.record_start == record_start
            {
                trace!("Chunk cache hit for record at {}", record_start);
                return Ok(hit.chunk.clone());
            }
        }

        let mut source = self.view()?;
        source.seek(record_start);
        let record = ContainerRecord::read_forward(&mut source, self.block_size(), diag)?;
        if record.size_on_disk() != u64::from(handle.record_size) {
            return Err(SidecarError::HandleRecordSize {
                expected: u64::from(handle.record_size),
                actual: record.size_on_disk(),
            }
            .into());
        }

        let chunk = record.read_chunk(&mut source, diag)?;
        if let Some(cache) = &self.cache {
            *cache.lock() = Some(CachedChunk {
                record_start,
                chunk: chunk.clone(),
            });
        }
        Ok(chunk)
    }

    /// Decode every record and box in the volume
    ///
    /// Holds every box in memory; intended for verifying a whole volume.
    pub fn read_all(&self, diag: &mut Diagnostics) -> ArchiveResult<Vec<ChunkBox>> {
        let mut source = self.view()?;
        let size = source.length()?;
        let block_size = self.block_size();
        if block_size != 0 && size % u64::from(block_size) != 0 {
            diag.push(Warning::UnalignedRecordEnd {
                end: size,
                block_size,
            });
        }

        source.seek(self.data_start());
        let mut boxes = Vec::new();
        let mut records = 0usize;
        while source.pos() < size {
            let record = ContainerRecord::read_forward(&mut source, block_size, diag)?;
            let chunk = record.read_chunk(&mut source, diag)?;
            boxes.extend(chunk.read_all_boxes(diag)?);
            source.seek(record.end);
            records += 1;
        }

        if source.pos() != size {
            return Err(SidecarError::Overrun {
                region: "volume",
                expected: size,
                actual: source.pos(),
            }
            .into());
        }

        debug!("Read {} records, {} boxes", records, boxes.len());
        Ok(boxes)
    }

    /// Locate the final record from the block-aligned end of the file
    pub fn read_last_record(&self, diag: &mut Diagnostics) -> ArchiveResult<ContainerRecord> {
        let mut source = self.view()?;
        let size = source.length()?;
        let block_size = u64::from(self.block_size());
        let end = if block_size == 0 {
            size
        } else {
            size - size % block_size
        };
        Ok(ContainerRecord::read_backward(
            &mut source,
            end,
            self.block_size(),
            diag,
        )?)
    }
}
