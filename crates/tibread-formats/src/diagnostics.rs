//! Soft integrity issues found while parsing
//!
//! The format is only partly understood, so several inconsistencies are
//! tolerated: parsing continues and the issue is recorded here. Every call
//! that can tolerate an issue takes a `&mut Diagnostics`; each recorded
//! warning is also logged through `tracing`.

use crate::header::Dialect;
use thiserror::Error;
use tracing::warn;

/// One tolerated integrity issue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// Stored header checksum does not match the header bytes
    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    HeaderChecksum {
        /// Value stored in the header
        stored: u32,
        /// Value computed over the header bytes
        computed: u32,
    },

    /// Header fields disagree with what the dialect normally writes
    #[error("unexpected {dialect:?} header: {reason}")]
    HeaderSanity {
        /// Dialect the header declared
        dialect: Dialect,
        /// Which expectation failed
        reason: String,
    },

    /// A record does not end on a block boundary
    #[error("record ending at {end} is not aligned to {block_size} bytes")]
    UnalignedRecordEnd {
        /// End offset of the record
        end: u64,
        /// Expected alignment
        block_size: u32,
    },

    /// Record header flags are not a known value
    #[error("unknown record flags {flags:#04x} at {offset}")]
    UnknownRecordFlags {
        /// Record start
        offset: u64,
        /// Flags byte
        flags: u8,
    },

    /// Record trailer flags are not a known value
    #[error("unknown record trailer flags {flags:#04x} at {offset}")]
    UnknownTrailerFlags {
        /// Trailer start
        offset: u64,
        /// Flags byte
        flags: u8,
    },

    /// Bytes after a compressed stream that should be zero padding are not
    #[error("non-zero padding after compressed stream at {offset}")]
    NonZeroPadding {
        /// First non-zero padding byte
        offset: u64,
    },

    /// A box carries a tag with no known decoder
    #[error("unknown box tag {tag:#06x} at {offset}")]
    UnknownBoxTag {
        /// Box start within its chunk
        offset: u64,
        /// Raw tag
        tag: u16,
    },

    /// A sidecar record prefix does not start with the usual marker
    #[error("unexpected sidecar record prefix {prefix:02x?} at {offset}")]
    UnexpectedSidecarPrefix {
        /// Prefix start
        offset: u64,
        /// First two prefix bytes
        prefix: [u8; 2],
    },

    /// A sidecar header record was skipped without decoding
    #[error("skipped sidecar header record at {offset}")]
    SkippedSidecarHeader {
        /// Record start
        offset: u64,
    },

    /// A slice trailer uses a backup form that cannot be decoded
    #[error("unsupported slice trailer form {form}; slice marked invalid")]
    UnsupportedSliceForm {
        /// Raw form value
        form: u32,
    },
}

/// Collector for [`Warning`]s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning
    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Move every warning of `other` into this collector without logging again
    pub fn absorb(&mut self, other: Self) {
        self.warnings.extend(other.warnings);
    }

    /// Warnings in the order they were recorded
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of recorded warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings matching a predicate
    pub fn count(&self, pred: impl Fn(&Warning) -> bool) -> usize {
        self.warnings.iter().filter(|w| pred(w)).count()
    }

    /// Consume the collector
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
