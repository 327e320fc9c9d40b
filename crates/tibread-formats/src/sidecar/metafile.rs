//! The sidecar metadata file next to a dialect A volume
//!
//! A sequence of `[16-byte prefix][record]` pairs with records aligned to
//! 128 bytes. Only chunked metadata records are decoded; the leading header
//! record is skipped.

use super::boxes::ChunkBox;
use super::error::{SidecarError, SidecarResult};
use super::metadata::MetaDataBox;
use super::record::{ContainerRecord, METADATA_RECORD_FLAGS, SIDECAR_HEADER_FLAGS, is_known_flags};
use crate::diagnostics::{Diagnostics, Warning};
use crate::source::ByteSource;
use tracing::debug;

/// Record alignment inside sidecar files
pub const SIDECAR_BLOCK_SIZE: u32 = 128;

/// Length of the prefix in front of each record
pub const SIDECAR_PREFIX_LEN: usize = 16;

/// Leading prefix bytes every known sidecar carries
pub const SIDECAR_PREFIX_MARKER: [u8; 2] = [0x77, 0x14];

/// Decoded sidecar file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarFile {
    /// Boxes of every metadata record, in file order
    pub boxes: Vec<ChunkBox>,
}

impl SidecarFile {
    /// Decode a whole sidecar file; it must be consumed exactly
    pub fn read(source: &mut dyn ByteSource, diag: &mut Diagnostics) -> SidecarResult<Self> {
        let size = source.length()?;
        source.seek(0);

        let mut boxes = Vec::new();
        while source.pos() < size {
            let prefix_offset = source.pos();
            let mut prefix = [0u8; SIDECAR_PREFIX_LEN];
            source.read_exact_into(&mut prefix)?;
            if prefix[..2] != SIDECAR_PREFIX_MARKER {
                diag.push(Warning::UnexpectedSidecarPrefix {
                    offset: prefix_offset,
                    prefix: [prefix[0], prefix[1]],
                });
            }

            let record = ContainerRecord::read_forward(source, SIDECAR_BLOCK_SIZE, diag)?;
            match record.flags {
                METADATA_RECORD_FLAGS => {
                    let chunk = record.read_chunk(source, diag)?;
                    let found = chunk.read_all_boxes(diag)?;
                    debug!(
                        "Sidecar record at {}: {} boxes",
                        record.start,
                        found.len()
                    );
                    boxes.extend(found);
                }
                SIDECAR_HEADER_FLAGS => {
                    diag.push(Warning::SkippedSidecarHeader {
                        offset: record.start,
                    });
                }
                flags => {
                    // Unknown values were already reported by the record reader
                    if is_known_flags(flags) {
                        diag.push(Warning::UnknownRecordFlags {
                            offset: record.start,
                            flags,
                        });
                    }
                }
            }

            source.seek(record.end);
        }

        if source.pos() != size {
            return Err(SidecarError::Overrun {
                region: "sidecar file",
                expected: size,
                actual: source.pos(),
            });
        }

        Ok(Self { boxes })
    }

    /// Metadata boxes in file order; each one describes a slice
    pub fn metadata(&self) -> impl Iterator<Item = &MetaDataBox> {
        self.boxes.iter().filter_map(ChunkBox::metadata)
    }
}
