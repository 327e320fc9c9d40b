//! Box handles stored in file entries
//!
//! A handle group is `[type u32][len u32]` followed by `len / 20` handle
//! records and four trailing bytes of unknown meaning:
//!
//! ```text
//! [record_start u64][start u32][size u32][record_size u32]
//! ```
//!
//! A single box can be split across several records; its handles appear in
//! read order and must not be re-sorted.

use super::error::{SidecarError, SidecarResult};
use crate::source::ByteSource;

/// Low byte of the handle type for blob boxes
pub const BLOB_HANDLE_TYPE: u32 = 0x04;

/// Bytes between the box header and the value stored in [`BoxHandle::start`]
const HANDLE_START_BIAS: u32 = 5;

/// Direct coordinates of one box in a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxHandle {
    /// Handle type; the low byte matches the box tag's high byte
    pub kind: u32,
    /// Record offset relative to the volume's data start
    pub record_start: u64,
    /// Size of the record on disk
    pub record_size: u32,
    /// Biased box offset inside the decompressed chunk
    pub start: u32,
    /// Payload bytes this handle contributes
    pub size: u32,
}

impl BoxHandle {
    /// Whether this handle points at file data
    pub const fn is_blob(&self) -> bool {
        self.kind & 0xFF == BLOB_HANDLE_TYPE
    }

    /// Offset of the box header inside the decompressed chunk
    pub fn box_offset(&self) -> SidecarResult<u64> {
        self.start
            .checked_sub(HANDLE_START_BIAS)
            .map(u64::from)
            .ok_or(SidecarError::InvalidHandle { start: self.start })
    }
}

/// Decode the handle groups occupying exactly `len` bytes at the cursor
pub fn read_handle_groups(source: &mut dyn ByteSource, len: u64) -> SidecarResult<Vec<BoxHandle>> {
    let end = source.pos() + len;
    let mut handles = Vec::new();

    while source.pos() < end {
        let kind = source.read_u32()?;
        let group_len = u64::from(source.read_u32()?);
        let group_end = source.pos() + group_len;

        while source.pos() < group_end {
            let record_start = source.read_u64()?;
            let start = source.read_u32()?;
            let size = source.read_u32()?;
            let record_size = source.read_u32()?;
            handles.push(BoxHandle {
                kind,
                record_start,
                record_size,
                start,
                size,
            });
        }

        if source.pos() != group_end {
            return Err(SidecarError::Overrun {
                region: "handle group",
                expected: group_end,
                actual: source.pos(),
            });
        }

        source.skip(4)?;
    }

    if source.pos() != end {
        return Err(SidecarError::Overrun {
            region: "handle list",
            expected: end,
            actual: source.pos(),
        });
    }

    Ok(handles)
}
