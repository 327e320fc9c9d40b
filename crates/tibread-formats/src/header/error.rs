//! Volume header error types

use crate::source::SourceError;
use thiserror::Error;

/// Errors raised while reading a volume header
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The file does not start with the volume magic
    #[error("invalid volume magic: expected 0xA2B924CE, got {0:#010X}")]
    InvalidMagic(u32),

    /// Declared header length cannot hold the fixed fields
    #[error("invalid header length {0}: shorter than the fixed header fields")]
    InvalidLength(u16),

    /// Dialect tag with no decoder
    #[error("no implementation for volume type {0}")]
    UnknownDialect(u16),

    /// Stored checksum disagrees with the header bytes (strict mode only)
    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Value stored in the header
        stored: u32,
        /// Value computed over the header bytes
        computed: u32,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// Reading the header bytes failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for header operations
pub type HeaderResult<T> = Result<T, HeaderError>;
