//! Dialect B error types

use crate::inflate::InflateError;
use crate::source::SourceError;
use thiserror::Error;

/// Errors raised while decoding dialect B structures
#[derive(Debug, Error)]
pub enum SequencedError {
    /// Record tag with no known encoding; the record length is unrecoverable
    #[error("unknown record type {tag} at {offset}")]
    UnknownRecordType {
        /// Record start
        offset: u64,
        /// Raw tag
        tag: u8,
    },

    /// A counted list decoded to a different number of items
    #[error("{region} declares {declared} items but holds {parsed}")]
    CountMismatch {
        /// What was being decoded
        region: &'static str,
        /// Count stored in the payload
        declared: u32,
        /// Items actually decoded
        parsed: usize,
    },

    /// A payload was not consumed exactly
    #[error("over/underrun of {region}: expected to end at {expected}, ended at {actual}")]
    Overrun {
        /// What was being decoded
        region: &'static str,
        /// Declared end
        expected: u64,
        /// Position actually reached
        actual: u64,
    },

    /// Record index payload does not start with the index magic
    #[error("bad record index magic: {}", hex::encode(.0))]
    IndexMagic([u8; 8]),

    /// Volume too short to hold a footer
    #[error("volume of {len} bytes cannot hold a footer")]
    FooterTooShort {
        /// Volume data length
        len: u64,
    },

    /// A specific record type was required at an offset
    #[error("expected {expected} record at {offset}, found type {found}")]
    UnexpectedRecord {
        /// Record start
        offset: u64,
        /// What was required
        expected: &'static str,
        /// Raw tag found
        found: u8,
    },

    /// Slice metadata ended before its listing
    #[error("end trailer at {offset} reached before the slice listing")]
    MissingListing {
        /// End trailer offset
        offset: u64,
    },

    /// Content records ended before a record index
    #[error("no record index after file metadata at {offset}")]
    MissingIndex {
        /// Where the search started
        offset: u64,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// Decompressing a record failed
    #[error(transparent)]
    Inflate(#[from] InflateError),

    /// Reading the underlying source failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for dialect B operations
pub type SequencedResult<T> = Result<T, SequencedError>;
