//! Dialect A error types

use crate::inflate::InflateError;
use crate::source::SourceError;
use thiserror::Error;

/// Errors raised while decoding dialect A structures
#[derive(Debug, Error)]
pub enum SidecarError {
    /// Record header and trailer disagree on the record size
    #[error("invalid header/trailer at {offset}: header size {header}, trailer size {trailer}")]
    RecordSizeMismatch {
        /// Record start
        offset: u64,
        /// Size stored in the header
        header: u32,
        /// Size stored in the trailer
        trailer: u32,
    },

    /// Record too small to hold its own trailer
    #[error("record at {offset} declares size {size}, too small for a trailer")]
    RecordTooSmall {
        /// Record start
        offset: u64,
        /// Declared size
        size: u32,
    },

    /// Chunk length prefix does not cover the decompressed record
    #[error("chunk does not take up full record: declared {declared} bytes, decompressed {actual}")]
    ChunkSize {
        /// Bytes covered by the length prefix
        declared: u64,
        /// Bytes actually decompressed
        actual: u64,
    },

    /// A bounded region was not consumed exactly
    #[error("over/underrun of {region}: expected to end at {expected}, ended at {actual}")]
    Overrun {
        /// What was being decoded
        region: &'static str,
        /// Declared end
        expected: u64,
        /// Position actually reached
        actual: u64,
    },

    /// Box too small to carry its tag
    #[error("unexpected small box at {offset}: size {size}")]
    SmallBox {
        /// Box start
        offset: u64,
        /// Declared size
        size: u32,
    },

    /// A fixed-size box body has the wrong size
    #[error("box {tag:#06x} at {offset} has body size {actual}, expected {expected}")]
    BoxSize {
        /// Box tag
        tag: u16,
        /// Box start
        offset: u64,
        /// Size the tag requires
        expected: u64,
        /// Declared body size
        actual: u64,
    },

    /// The configuration XML marker is missing from a metadata box
    #[error("could not find the configuration xml in metadata box at {offset}")]
    XmlNotFound {
        /// Box start
        offset: u64,
    },

    /// File entry carries an unknown type byte
    #[error("unknown file type {kind} in entry at {offset}")]
    UnknownFileType {
        /// Entry start
        offset: u64,
        /// Raw type byte
        kind: u8,
    },

    /// A handle's box offset points before the chunk data
    #[error("invalid box handle start {start}")]
    InvalidHandle {
        /// Raw handle start
        start: u32,
    },

    /// A handle's recorded size disagrees with the record found on disk
    #[error("handle record size mismatch with file: handle says {expected}, record is {actual}")]
    HandleRecordSize {
        /// Size stored in the handle
        expected: u64,
        /// Size of the record on disk
        actual: u64,
    },

    /// A handle resolved to a box that is not a blob
    #[error("box at {offset} is not a blob")]
    NotABlob {
        /// Box start in its chunk
        offset: u64,
    },

    /// Decompressing a record failed
    #[error(transparent)]
    Inflate(#[from] InflateError),

    /// Reading the underlying source failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for dialect A operations
pub type SidecarResult<T> = Result<T, SidecarError>;
