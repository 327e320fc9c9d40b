//! Type-tagged records
//!
//! A record is a one byte tag followed by a compressed payload whose length is
//! not stored; the record ends where the decompressor stops. Raw-deflate
//! records carry one extra 4-byte word after the stream. End trailers have no
//! payload at all.

use super::config::{ConfigAttribute, parse_config};
use super::error::{SequencedError, SequencedResult};
use super::index::RecordIndex;
use super::listing::{ListingEntry, parse_listing};
use crate::inflate::{Framing, StreamDecoder};
use crate::source::ByteSource;
use bytes::Bytes;
use tracing::trace;

/// Record type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// Slice configuration attributes
    Config = 101,
    /// First metadata record of a file
    FirstFileMeta = 102,
    /// File metadata following [`RecordType::FirstFileMeta`]
    FileMetaA = 1,
    /// File metadata following [`RecordType::FileMetaA`]
    FileMetaB = 2,
    /// File metadata following [`RecordType::FileMetaB`]
    FileMetaC = 5,
    /// File listing of the slice
    Listing = 103,
    /// Marks the start of the slice trailer
    EndTrailer = 104,
    /// Data block locations of one file
    RecordIndex = 108,
    /// File data
    Blob = 109,
    /// Written after the blobs of a file
    BlobSuffix = 110,
}

impl RecordType {
    /// Map a raw tag
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            101 => Self::Config,
            102 => Self::FirstFileMeta,
            1 => Self::FileMetaA,
            2 => Self::FileMetaB,
            5 => Self::FileMetaC,
            103 => Self::Listing,
            104 => Self::EndTrailer,
            108 => Self::RecordIndex,
            109 => Self::Blob,
            110 => Self::BlobSuffix,
            _ => return None,
        })
    }

    /// Raw tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Payload framing; `None` for records without payload
    pub const fn framing(self) -> Option<Framing> {
        match self {
            Self::EndTrailer => None,
            Self::RecordIndex | Self::Blob | Self::BlobSuffix => Some(Framing::Zlib),
            Self::Config
            | Self::FirstFileMeta
            | Self::FileMetaA
            | Self::FileMetaB
            | Self::FileMetaC
            | Self::Listing => Some(Framing::Raw),
        }
    }
}

/// Decoded record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    /// Configuration attributes
    Config(Vec<ConfigAttribute>),
    /// File listing
    Listing(Vec<ListingEntry>),
    /// Record index
    Index(RecordIndex),
    /// File data block
    Blob(Bytes),
    /// End trailer marker
    EndTrailer,
    /// Payload with no known structure
    Opaque(Bytes),
}

/// One record and its extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record type
    pub kind: RecordType,
    /// Offset of the tag byte
    pub start: u64,
    /// Offset after the payload and any trailing word
    pub end: u64,
    /// Word following raw-deflate payloads; its meaning is unknown
    pub check_word: Option<u32>,
    /// Decoded payload
    pub body: RecordBody,
}

impl Record {
    /// Decode the record at the cursor, leaving the cursor at its end
    pub fn read(source: &mut dyn ByteSource) -> SequencedResult<Self> {
        let start = source.pos();
        let tag = source.read_u8()?;
        let kind = RecordType::from_tag(tag)
            .ok_or(SequencedError::UnknownRecordType { offset: start, tag })?;

        let Some(framing) = kind.framing() else {
            return Ok(Self {
                kind,
                start,
                end: source.pos(),
                check_word: None,
                body: RecordBody::EndTrailer,
            });
        };

        let inflated = StreamDecoder::new(framing).decode(source, None)?;
        let check_word = match framing {
            Framing::Raw => Some(source.read_u32()?),
            Framing::Zlib => None,
        };
        let payload = inflated.data;
        trace!(
            "Record {:?} at {}: {} compressed, {} decompressed",
            kind,
            start,
            inflated.consumed,
            payload.len()
        );

        let body = match kind {
            RecordType::Config => RecordBody::Config(parse_config(payload)?),
            RecordType::Listing => RecordBody::Listing(parse_listing(payload)?),
            RecordType::RecordIndex => RecordBody::Index(RecordIndex::parse(payload)?),
            RecordType::Blob => RecordBody::Blob(payload),
            _ => RecordBody::Opaque(payload),
        };

        Ok(Self {
            kind,
            start,
            end: source.pos(),
            check_word,
            body,
        })
    }

    /// Decode records until the end of the source or an end trailer
    pub fn read_all(source: &mut dyn ByteSource) -> SequencedResult<Vec<Self>> {
        let size = source.length()?;
        let mut records = Vec::new();
        while source.pos() < size {
            let record = Self::read(source)?;
            let done = record.kind == RecordType::EndTrailer;
            records.push(record);
            if done {
                break;
            }
        }
        Ok(records)
    }

    /// Blob payload, if this is a blob record
    pub fn blob(&self) -> Option<&Bytes> {
        match &self.body {
            RecordBody::Blob(data) => Some(data),
            _ => None,
        }
    }
}
