//! Typed boxes inside a chunk
//!
//! ```text
//! [magic u8][size u24]                 size == 0: empty box
//! [magic u8][size u24][tag u16][body]  body is size - 2 bytes
//! ```
//!
//! The tag space is only partly known. Unknown tags decode to
//! [`BoxBody::Unknown`] and parsing continues at the declared box end; the
//! cursor always ends at the declared end even when a decoder understood only
//! a prefix of the body.

use super::error::{SidecarError, SidecarResult};
use super::metadata::MetaDataBox;
use crate::diagnostics::{Diagnostics, Warning};
use crate::source::ByteSource;
use crate::time::Timestamp;
use bytes::Bytes;

/// Known box tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum BoxTag {
    /// Structural container
    Container = 0x01C0,
    /// Raw file data
    Blob = 0x04C0,
    /// Modification time
    StatTime = 0x05C0,
    /// Owner ids
    StatUser = 0x06C0,
    /// Extended attributes
    Attributes = 0x07C0,
    /// Per-slice metadata (sidecar files)
    MetaData = 0x0040,
    /// Metadata index (sidecar files)
    MetaIndex = 0x0070,
}

impl BoxTag {
    /// Map a raw tag
    pub const fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0x01C0 => Self::Container,
            0x04C0 => Self::Blob,
            0x05C0 => Self::StatTime,
            0x06C0 => Self::StatUser,
            0x07C0 => Self::Attributes,
            0x0040 => Self::MetaData,
            0x0070 => Self::MetaIndex,
            _ => return None,
        })
    }

    /// Body size the tag requires, for fixed-size boxes
    const fn fixed_body_size(self) -> Option<u64> {
        match self {
            Self::Container => Some(7),
            Self::StatTime => Some(19),
            Self::StatUser => Some(23),
            _ => None,
        }
    }
}

/// One extended attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Raw attribute name
    pub key: Bytes,
    /// Raw attribute value
    pub value: Bytes,
}

/// Decoded body of a box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxBody {
    /// Zero-size box
    Empty,
    /// Structural container; its body is not understood
    Container,
    /// File data
    Blob(Bytes),
    /// Modification time
    StatTime {
        /// Modification time
        mtime: Timestamp,
    },
    /// Owner ids
    StatUser {
        /// Owning user id
        uid: u32,
        /// Owning group id
        gid: u32,
    },
    /// Extended attributes in stored order
    Attributes(Vec<Attribute>),
    /// Slice metadata with its file tree
    MetaData(Box<MetaDataBox>),
    /// Metadata index; kept opaque
    MetaIndex,
    /// Tag with no decoder
    Unknown {
        /// Raw tag
        tag: u16,
    },
}

/// One box and its extent within the chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBox {
    /// Leading magic byte, not validated
    pub magic: u8,
    /// Offset of the box header
    pub start: u64,
    /// Offset immediately after the body
    pub end: u64,
    /// Decoded body
    pub body: BoxBody,
}

impl ChunkBox {
    /// Decode the box at the current position, leaving the cursor at its end
    pub fn read(source: &mut dyn ByteSource, diag: &mut Diagnostics) -> SidecarResult<Self> {
        let start = source.pos();
        let magic = source.read_u8()?;
        let size = source.read_u24()?;

        // Zero-size boxes exist in real chunks
        if size == 0 {
            return Ok(Self {
                magic,
                start,
                end: source.pos(),
                body: BoxBody::Empty,
            });
        }
        if size < 2 {
            return Err(SidecarError::SmallBox {
                offset: start,
                size,
            });
        }

        let raw_tag = source.read_u16()?;
        let body_start = source.pos();
        let body_size = u64::from(size - 2);
        let body_end = body_start + body_size;

        let body = match BoxTag::from_raw(raw_tag) {
            Some(tag) => {
                if let Some(expected) = tag.fixed_body_size()
                    && expected != body_size
                {
                    return Err(SidecarError::BoxSize {
                        tag: raw_tag,
                        offset: start,
                        expected,
                        actual: body_size,
                    });
                }
                Self::read_body(source, tag, start, body_end)?
            }
            None => {
                diag.push(Warning::UnknownBoxTag {
                    offset: start,
                    tag: raw_tag,
                });
                BoxBody::Unknown { tag: raw_tag }
            }
        };

        source.seek(body_end);
        Ok(Self {
            magic,
            start,
            end: body_end,
            body,
        })
    }

    fn read_body(
        source: &mut dyn ByteSource,
        tag: BoxTag,
        start: u64,
        body_end: u64,
    ) -> SidecarResult<BoxBody> {
        Ok(match tag {
            BoxTag::Container => BoxBody::Container,
            BoxTag::Blob => {
                source.skip(3)?;
                let len = body_end.checked_sub(source.pos()).ok_or(SidecarError::Overrun {
                    region: "blob box",
                    expected: body_end,
                    actual: source.pos(),
                })?;
                BoxBody::Blob(Bytes::from(source.read_bytes(len as usize)?))
            }
            BoxTag::StatTime => {
                source.skip(3)?;
                BoxBody::StatTime {
                    mtime: Timestamp::from_millis(source.read_u64()?),
                }
            }
            BoxTag::StatUser => {
                source.skip(11)?;
                let uid = source.read_u32()?;
                let gid = source.read_u32()?;
                BoxBody::StatUser { uid, gid }
            }
            BoxTag::Attributes => BoxBody::Attributes(read_attributes(source, body_end)?),
            BoxTag::MetaData => {
                BoxBody::MetaData(Box::new(MetaDataBox::read(source, start)?))
            }
            BoxTag::MetaIndex => BoxBody::MetaIndex,
        })
    }

    /// Blob payload, if this is a blob box
    pub fn blob(&self) -> Option<&Bytes> {
        match &self.body {
            BoxBody::Blob(data) => Some(data),
            _ => None,
        }
    }

    /// Metadata, if this is a metadata box
    pub fn metadata(&self) -> Option<&MetaDataBox> {
        match &self.body {
            BoxBody::MetaData(meta) => Some(meta),
            _ => None,
        }
    }
}

fn read_attributes(source: &mut dyn ByteSource, body_end: u64) -> SidecarResult<Vec<Attribute>> {
    source.skip(3)?;

    let mut list = Vec::new();
    while source.pos() < body_end {
        let key_len = source.read_u16()?;
        let value_len = source.read_u64()?;
        let attr_end = source
            .pos()
            .saturating_add(u64::from(key_len))
            .saturating_add(value_len);
        if attr_end > body_end {
            return Err(SidecarError::Overrun {
                region: "attribute",
                expected: body_end,
                actual: attr_end,
            });
        }
        let key = Bytes::from(source.read_bytes(key_len as usize)?);
        let value = Bytes::from(source.read_bytes(value_len as usize)?);
        list.push(Attribute { key, value });
    }

    if source.pos() != body_end {
        return Err(SidecarError::Overrun {
            region: "attribute list",
            expected: body_end,
            actual: source.pos(),
        });
    }
    Ok(list)
}
