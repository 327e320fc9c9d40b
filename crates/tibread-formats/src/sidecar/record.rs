//! Block-aligned container records
//!
//! ```text
//! [flags u8][size u24][zlib stream + zero padding][trailer flags u8][size u24]
//! ^start    ^inner_start                          ^inner_end             end^
//! ```
//!
//! `size` counts every byte after the header, so `end = start + 4 + size`.

use super::chunk::Chunk;
use super::error::{SidecarError, SidecarResult};
use crate::diagnostics::{Diagnostics, Warning};
use crate::inflate::StreamDecoder;
use crate::source::ByteSource;
use bytes::Bytes;

/// Header flags of a data record in a volume file
pub const VOLUME_RECORD_FLAGS: [u8; 2] = [0x98, 0x68];
/// Header flags of a chunked metadata record in a sidecar file
pub const METADATA_RECORD_FLAGS: u8 = 0x88;
/// Header flags of the leading sidecar record
pub const SIDECAR_HEADER_FLAGS: u8 = 0x80;
/// Trailer flags every known record carries
pub const TRAILER_FLAGS: u8 = 0x78;

const RECORD_HEADER_LEN: u64 = 4;

/// Whether a header flags byte is one of the known values
pub fn is_known_flags(flags: u8) -> bool {
    VOLUME_RECORD_FLAGS.contains(&flags)
        || flags == METADATA_RECORD_FLAGS
        || flags == SIDECAR_HEADER_FLAGS
}

/// Location of one record; every offset is absolute within its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Header flags
    pub flags: u8,
    /// Offset of the header
    pub start: u64,
    /// Offset immediately after the trailer
    pub end: u64,
    /// Offset of the compressed body
    pub inner_start: u64,
    /// Offset of the trailer
    pub inner_end: u64,
}

fn read_tag(source: &mut dyn ByteSource) -> SidecarResult<(u8, u32)> {
    let flags = source.read_u8()?;
    let size = source.read_u24()?;
    Ok((flags, size))
}

impl ContainerRecord {
    /// Read the record whose header starts at the current position
    ///
    /// The cursor is left at the record end.
    pub fn read_forward(
        source: &mut dyn ByteSource,
        block_size: u32,
        diag: &mut Diagnostics,
    ) -> SidecarResult<Self> {
        let start = source.pos();
        let (flags, size) = read_tag(source)?;
        if u64::from(size) < RECORD_HEADER_LEN {
            return Err(SidecarError::RecordTooSmall {
                offset: start,
                size,
            });
        }
        if !is_known_flags(flags) {
            diag.push(Warning::UnknownRecordFlags {
                offset: start,
                flags,
            });
        }

        let inner_start = start + RECORD_HEADER_LEN;
        let end = inner_start + u64::from(size);
        let inner_end = end - RECORD_HEADER_LEN;

        source.seek(inner_end);
        let (trailer_flags, trailer_size) = read_tag(source)?;
        Self::check_trailer(start, inner_end, size, trailer_flags, trailer_size, diag)?;
        Self::check_alignment(end, block_size, diag);

        Ok(Self {
            flags,
            start,
            end,
            inner_start,
            inner_end,
        })
    }

    /// Read the record that ends exactly at `end`
    ///
    /// The trailer is read first to find the header. The cursor is left at
    /// the record end.
    pub fn read_backward(
        source: &mut dyn ByteSource,
        end: u64,
        block_size: u32,
        diag: &mut Diagnostics,
    ) -> SidecarResult<Self> {
        let inner_end = end
            .checked_sub(RECORD_HEADER_LEN)
            .ok_or(SidecarError::RecordTooSmall {
                offset: end,
                size: 0,
            })?;

        source.seek(inner_end);
        let (trailer_flags, trailer_size) = read_tag(source)?;
        let start = end
            .checked_sub(RECORD_HEADER_LEN + u64::from(trailer_size))
            .filter(|_| u64::from(trailer_size) >= RECORD_HEADER_LEN)
            .ok_or(SidecarError::RecordTooSmall {
                offset: inner_end,
                size: trailer_size,
            })?;

        source.seek(start);
        let (flags, size) = read_tag(source)?;
        if !is_known_flags(flags) {
            diag.push(Warning::UnknownRecordFlags {
                offset: start,
                flags,
            });
        }
        Self::check_trailer(start, inner_end, size, trailer_flags, trailer_size, diag)?;
        Self::check_alignment(end, block_size, diag);

        source.seek(end);
        Ok(Self {
            flags,
            start,
            end,
            inner_start: start + RECORD_HEADER_LEN,
            inner_end,
        })
    }

    fn check_trailer(
        start: u64,
        trailer_offset: u64,
        size: u32,
        trailer_flags: u8,
        trailer_size: u32,
        diag: &mut Diagnostics,
    ) -> SidecarResult<()> {
        if trailer_flags != TRAILER_FLAGS {
            diag.push(Warning::UnknownTrailerFlags {
                offset: trailer_offset,
                flags: trailer_flags,
            });
        }
        if trailer_size != size {
            return Err(SidecarError::RecordSizeMismatch {
                offset: start,
                header: size,
                trailer: trailer_size,
            });
        }
        Ok(())
    }

    fn check_alignment(end: u64, block_size: u32, diag: &mut Diagnostics) {
        if block_size != 0 && end % u64::from(block_size) != 0 {
            diag.push(Warning::UnalignedRecordEnd { end, block_size });
        }
    }

    /// Total bytes occupied by the record
    pub const fn size_on_disk(&self) -> u64 {
        self.end - self.start
    }

    /// Decompress the record body
    ///
    /// The zlib stream must end before the trailer; non-zero bytes between
    /// the end of the stream and the trailer are recorded as a warning. The
    /// cursor is left at the record end.
    pub fn inflate(&self, source: &mut dyn ByteSource, diag: &mut Diagnostics) -> SidecarResult<Bytes> {
        source.seek(self.inner_start);
        let inflated =
            StreamDecoder::zlib().decode(source, Some(self.inner_end - self.inner_start))?;

        let padding_start = source.pos();
        let padding = source.read_bytes((self.inner_end - padding_start) as usize)?;
        if let Some(at) = padding.iter().position(|&b| b != 0) {
            diag.push(Warning::NonZeroPadding {
                offset: padding_start + at as u64,
            });
        }

        source.seek(self.end);
        Ok(inflated.data)
    }

    /// Decompress the record body and frame it as a chunk
    pub fn read_chunk(&self, source: &mut dyn ByteSource, diag: &mut Diagnostics) -> SidecarResult<Chunk> {
        Chunk::parse(self.inflate(source, diag)?)
    }
}
