//! Configuration attributes carried by config records
//!
//! ```text
//! [165 opaque bytes][count u32]
//! {[key_len u32][key UTF-16LE][value_len u32][value UTF-16LE]}*
//! [1 trailing byte]
//! ```
//!
//! Lengths count UTF-16 code units. Values usually start with a byte order
//! mark, which is dropped.

use super::error::{SequencedError, SequencedResult};
use crate::source::{ByteSource, MemorySource, SourceReader, decode_utf16le};
use binrw::BinRead;
use bytes::Bytes;

/// Opaque bytes in front of the attribute count
const ATTRIBUTES_OFFSET: u64 = 165;

/// One key/value pair of the slice configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAttribute {
    /// Attribute name
    pub key: String,
    /// Attribute value with any byte order mark removed
    pub value: String,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawAttribute {
    key_len: u32,
    #[br(count = key_len as usize * 2)]
    key: Vec<u8>,
    value_len: u32,
    #[br(count = value_len as usize * 2)]
    value: Vec<u8>,
}

impl From<RawAttribute> for ConfigAttribute {
    fn from(raw: RawAttribute) -> Self {
        Self {
            key: decode_utf16le(&raw.key),
            value: decode_utf16le(&raw.value),
        }
    }
}

/// Decode a config record payload
pub fn parse_config(payload: Bytes) -> SequencedResult<Vec<ConfigAttribute>> {
    let mut source = MemorySource::new(payload);
    let len = source.length()?;
    source.seek(ATTRIBUTES_OFFSET);
    let declared = source.read_u32()?;

    // One trailing byte follows the last attribute
    let attrs_end = len.saturating_sub(1);
    let mut attrs = Vec::with_capacity(declared.min(1024) as usize);
    while source.pos() < attrs_end {
        let raw = RawAttribute::read(&mut SourceReader::new(&mut source))?;
        attrs.push(ConfigAttribute::from(raw));
    }

    if source.pos() != attrs_end {
        return Err(SequencedError::Overrun {
            region: "config attributes",
            expected: attrs_end,
            actual: source.pos(),
        });
    }
    if attrs.len() != declared as usize {
        return Err(SequencedError::CountMismatch {
            region: "config record",
            declared,
            parsed: attrs.len(),
        });
    }

    Ok(attrs)
}
