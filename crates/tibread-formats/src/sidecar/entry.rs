//! File entries embedded in metadata boxes
//!
//! Entries form a flat pre-order run: a directory entry is immediately
//! followed by every entry of its subtree, and records how many there are.
//!
//! ```text
//! [prefix_len u32][prefix][rest_len u32]      extent = rest_len offset + rest_len
//! 8 or 32 opaque bytes                        32 when the byte at +4 is 0x40
//! [first_part u16][name_chars u16][u16][type u8][3]
//! [size u64][8][atime u64][mtime u64][4][name UTF-16LE]
//! type gap: root 41, directory 85, regular 35 (entry count u32 at +45)
//! [handles_len u32][handle groups][4]
//! ```

use super::error::{SidecarError, SidecarResult};
use super::handle::{BoxHandle, read_handle_groups};
use crate::source::ByteSource;
use crate::time::Timestamp;

const TYPE_REGULAR: u8 = 0;
const TYPE_DIRECTORY: u8 = 128;
const TYPE_ROOT: u8 = 131;

/// Marker selecting the long opaque block after the entry prefix
const LONG_BLOCK_MARKER: u8 = 0x40;

/// Offset of the entry count past the end of a directory name
const ENTRY_COUNT_OFFSET: u64 = 45;

/// What an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with data handles
    Regular,
    /// Directory
    Directory {
        /// Entries in the subtree that follows
        num_entries: u32,
    },
    /// Top-level volume root
    Root {
        /// Entries in the subtree that follows
        num_entries: u32,
    },
}

/// One file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Offset of the entry
    pub start: u64,
    /// Offset after this entry's own description
    pub end: u64,
    /// Offset after the entry and everything nested in it
    pub extent: u64,
    /// Entry name
    pub name: String,
    /// Logical size in bytes
    pub size: u64,
    /// Access time
    pub atime: Timestamp,
    /// Modification time
    pub mtime: Timestamp,
    /// Entry type
    pub kind: EntryKind,
    /// Data handles, in stored order; empty for directories
    pub handles: Vec<BoxHandle>,
}

impl FileEntry {
    /// Whether the entry is a directory or the root
    pub const fn is_dir(&self) -> bool {
        !matches!(self.kind, EntryKind::Regular)
    }

    /// Number of entries nested beneath this one
    pub const fn num_entries(&self) -> u32 {
        match self.kind {
            EntryKind::Regular => 0,
            EntryKind::Directory { num_entries } | EntryKind::Root { num_entries } => num_entries,
        }
    }

    /// Handles pointing at file data, in read order
    pub fn blob_handles(&self) -> impl Iterator<Item = &BoxHandle> {
        self.handles.iter().filter(|h| h.is_blob())
    }

    /// Decode the entry at the cursor, leaving the cursor at [`FileEntry::end`]
    pub fn read(source: &mut dyn ByteSource) -> SidecarResult<Self> {
        let start = source.pos();

        let prefix_len = source.read_u32()?;
        source.skip(i64::from(prefix_len))?;

        let rest_offset = source.pos();
        let rest_len = source.read_u32()?;
        let extent = rest_offset + u64::from(rest_len);

        let block_start = source.pos();
        source.seek(block_start + 4);
        let marker = source.read_u8()?;
        source.seek(block_start + if marker == LONG_BLOCK_MARKER { 32 } else { 8 });

        let _first_part = source.read_u16()?;
        let name_chars = source.read_u16()?;
        source.skip(2)?;
        let raw_type = source.read_u8()?;
        source.skip(3)?;

        let size = source.read_u64()?;
        source.skip(8)?;
        let atime = Timestamp::from_millis(source.read_u64()?);
        let mtime = Timestamp::from_millis(source.read_u64()?);
        source.skip(4)?;

        let name = source.read_utf16(name_chars as usize)?;

        let after_name = source.pos();
        let kind = match raw_type {
            TYPE_REGULAR => {
                source.seek(after_name + 35);
                EntryKind::Regular
            }
            TYPE_DIRECTORY | TYPE_ROOT => {
                source.seek(after_name + ENTRY_COUNT_OFFSET);
                let num_entries = source.read_u32()?;
                if raw_type == TYPE_ROOT {
                    source.seek(after_name + 41);
                    EntryKind::Root { num_entries }
                } else {
                    source.seek(after_name + 85);
                    EntryKind::Directory { num_entries }
                }
            }
            kind => {
                return Err(SidecarError::UnknownFileType {
                    offset: start,
                    kind,
                });
            }
        };

        let handles_len = u64::from(source.read_u32()?);
        let handles = match kind {
            EntryKind::Regular => read_handle_groups(source, handles_len)?,
            _ => {
                source.skip(handles_len as i64)?;
                Vec::new()
            }
        };
        source.skip(4)?;

        let end = match kind {
            EntryKind::Regular => extent,
            _ => source.pos(),
        };
        source.seek(end);

        Ok(Self {
            start,
            end,
            extent,
            name,
            size,
            atime,
            mtime,
            kind,
            handles,
        })
    }
}
