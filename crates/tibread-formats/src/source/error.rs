//! Byte source error types

use thiserror::Error;

/// Byte source operation result type
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised by byte sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// A read would run past the end of the source window
    #[error("read of {requested} bytes at {pos} overruns source end {end}")]
    Overrun {
        /// Position the read started at
        pos: u64,
        /// Number of bytes requested
        requested: u64,
        /// End of the readable window
        end: u64,
    },

    /// A relative seek would move before the start of the window
    #[error("seek by {delta} from {pos} moves before the start of the source")]
    SeekBeforeStart {
        /// Position before the seek
        pos: u64,
        /// Signed distance requested
        delta: i64,
    },

    /// A slice range does not fit inside its parent
    #[error("invalid slice range {start}..{end} for source of length {len}")]
    InvalidRange {
        /// Requested start
        start: u64,
        /// Requested end
        end: u64,
        /// Length of the parent window
        len: u64,
    },

    /// Composite sources only support whole-source slices
    #[error("partial slices are not supported on composite sources")]
    PartialSlice,

    /// A physical file could not be opened or mapped
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// File that failed to open
        path: std::path::PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// I/O error from the underlying resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
