//! Inflate error types

use crate::source::SourceError;
use thiserror::Error;

/// Errors raised while inflating a compressed stream
#[derive(Debug, Error)]
pub enum InflateError {
    /// The decompressor rejected the input
    #[error("malformed compressed stream starting at {start}: {source}")]
    Decode {
        /// Stream start within the source
        start: u64,
        /// Decompressor error
        source: flate2::DecompressError,
    },

    /// The decompressor stopped making progress without ending the stream
    #[error("compressed stream starting at {start} stalled after {consumed} bytes")]
    Stalled {
        /// Stream start within the source
        start: u64,
        /// Compressed bytes consumed so far
        consumed: u64,
    },

    /// The source ran out before the stream ended
    #[error("premature end of source: stream starting at {start} still open after {fed} bytes")]
    PrematureEnd {
        /// Stream start within the source
        start: u64,
        /// Compressed bytes fed to the decompressor
        fed: u64,
    },

    /// Reading compressed input failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for inflate operations
pub type InflateResult<T> = Result<T, InflateError>;
