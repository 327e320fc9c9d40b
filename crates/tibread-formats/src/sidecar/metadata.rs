//! Metadata boxes: one per slice in the sidecar file
//!
//! The body holds a length-prefixed inner region. Its first bytes are only
//! partly understood: the slice id and creation time sit at fixed offsets,
//! but the layout in front of the embedded configuration XML varies, so the
//! XML is located by searching for its UTF-16 `<?xml` signature. File entries
//! follow the XML.

use super::entry::FileEntry;
use super::error::{SidecarError, SidecarResult};
use crate::scan::find_forward;
use crate::source::{ByteSource, decode_utf16le};
use crate::time::Timestamp;

/// BOM followed by `<?xml` in UTF-16LE
pub const XML_MARKER: [u8; 11] = [
    0xFF, 0xFE, 0x3C, 0x00, 0x3F, 0x00, 0x78, 0x00, 0x6D, 0x00, 0x6C,
];

/// Where the XML search starts, relative to the inner region
const XML_SEARCH_OFFSET: u64 = 100;

/// Opaque bytes before the slice id
const SLICE_ID_OFFSET: i64 = 53;

/// Decoded metadata box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaDataBox {
    /// Slice UUID
    pub slice_id: [u8; 16],
    /// Slice creation time
    pub created: Timestamp,
    /// Embedded configuration XML
    pub xml: String,
    /// File tree in pre-order
    pub files: Vec<FileEntry>,
}

impl MetaDataBox {
    /// Decode a metadata body starting at the cursor
    ///
    /// `box_start` is only used for error reporting.
    pub fn read(source: &mut dyn ByteSource, box_start: u64) -> SidecarResult<Self> {
        let inner_size = u64::from(source.read_u24()?);
        let inner_start = source.pos();
        let inner_end = inner_start + inner_size;

        source.skip(SLICE_ID_OFFSET)?;
        let mut slice_id = [0u8; 16];
        source.read_exact_into(&mut slice_id)?;
        let created = Timestamp::from_millis(source.read_u64()?);

        let marker = find_forward(
            source,
            &XML_MARKER,
            inner_start + XML_SEARCH_OFFSET,
            inner_end,
        )?
        .ok_or(SidecarError::XmlNotFound { offset: box_start })?;

        // The XML byte length sits right before the marker
        source.seek(marker - 2);
        let xml_len = source.read_u16()?;
        let xml = decode_utf16le(&source.read_bytes(xml_len as usize)?);

        let lookahead = source.read_u8()?;
        source.skip(-1)?;
        source.skip(if lookahead != 0 { 52 } else { 8 })?;

        let mut files = Vec::new();
        while source.pos() < inner_end.saturating_sub(3) {
            files.push(FileEntry::read(source)?);
        }

        Ok(Self {
            slice_id,
            created,
            xml,
            files,
        })
    }

    /// Slice id as a lowercase hex string
    pub fn slice_id_hex(&self) -> String {
        hex::encode(self.slice_id)
    }
}
