//! Error types for archive operations

use std::path::PathBuf;
use thiserror::Error;
use tibread_formats::header::Dialect;
use tibread_formats::inflate::InflateError;
use tibread_formats::sequenced::SequencedError;
use tibread_formats::sidecar::SidecarError;
use tibread_formats::{HeaderError, SourceError};

/// Archive operation result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Broad failure classes
///
/// Soft integrity issues are never errors; they are collected as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The data breaks a structural rule of the format
    FormatViolation,
    /// A file is missing or could not be read
    Resource,
}

/// Errors raised while opening or reading an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The volume file given to open does not exist
    #[error("missing volume file: {}", .0.display())]
    MissingVolume(PathBuf),

    /// A sidecar volume has no metadata file next to it
    #[error("missing metadata file: {}", .0.display())]
    MissingSidecar(PathBuf),

    /// Listing the archive directory failed
    #[error("failed to list {}: {source}", path.display())]
    Directory {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A sequenced volume's file name does not follow the naming scheme
    #[error("invalid filename format: {0}")]
    InvalidFileName(String),

    /// A sibling volume belongs to the other dialect
    #[error("expected {} to be a {expected:?} volume, found {found:?}", path.display())]
    DialectMismatch {
        /// Offending volume
        path: PathBuf,
        /// Dialect of the archive
        expected: Dialect,
        /// Dialect in the volume header
        found: Dialect,
    },

    /// Header sequence numbers do not run 1..N
    #[error("invalid sequence chain: expected sequence {expected}, found {found}")]
    InvalidSequenceChain {
        /// Sequence required at this position
        expected: u32,
        /// Sequence found
        found: u32,
    },

    /// A volume carries a different archive key than the one opened
    #[error("mismatching archive keys: {} has {found}, expected {expected}", path.display())]
    ArchiveKeyMismatch {
        /// Offending volume
        path: PathBuf,
        /// Archive key of the opened volume, hex
        expected: String,
        /// Archive key found, hex
        found: String,
    },

    /// Slice numbers in file names skip a value
    #[error("gap in slice numbering: expected slice {expected}, found {found}")]
    SliceNumberGap {
        /// Slice number required next
        expected: u32,
        /// Slice number found
        found: u32,
    },

    /// Volume numbers in file names skip a value
    #[error("gap in volume numbering in slice {slice}: expected volume {expected}, found {found}")]
    VolumeNumberGap {
        /// Slice number
        slice: u32,
        /// Volume number required next
        expected: u32,
        /// Volume number found
        found: u32,
    },

    /// The data windows of a slice disagree with its footer
    #[error("slice {slice} spans {actual} bytes but its footer declares {declared}")]
    SliceLength {
        /// Slice index
        slice: usize,
        /// Length in the footer
        declared: u64,
        /// Length of the slice's data windows
        actual: u64,
    },

    /// Repeated configuration values within one slice disagree
    #[error("mismatching {field} in slice configuration: {existing:?} vs {new:?}")]
    ConfigConflict {
        /// Field name
        field: &'static str,
        /// Value seen first
        existing: String,
        /// Disagreeing value
        new: String,
    },

    /// Configuration text could not be decoded
    #[error("invalid slice configuration: {0}")]
    InvalidConfig(String),

    /// A directory subtree count runs past its parent
    #[error("entry {index} claims {count} nested entries, past the end of its parent")]
    TreeOverrun {
        /// Entry index
        index: usize,
        /// Claimed subtree size
        count: u32,
    },

    /// Slice index out of range
    #[error("no slice {0}")]
    NoSuchSlice(usize),

    /// Node index out of range
    #[error("no node {node} in slice {slice}")]
    NoSuchNode {
        /// Slice index
        slice: usize,
        /// Node index
        node: usize,
    },

    /// Content was requested from something that is not a regular file
    #[error("node {0} is not a regular file")]
    NotAFile(usize),

    /// The slice could not be decoded, so it has no content
    #[error("slice {0} has an unsupported form")]
    UnsupportedSlice(usize),

    /// A data block is shorter than the range it must supply
    #[error("bad chunk length obtained: needed {expected} bytes, block holds {actual}")]
    ShortBlob {
        /// Bytes required from the block
        expected: u64,
        /// Bytes the block holds
        actual: u64,
    },

    /// The file's data blocks do not cover its logical size
    #[error("file data ends at {covered}, before its size {size}")]
    IncompleteContent {
        /// End of the covered range
        covered: u64,
        /// Logical size
        size: u64,
    },

    /// A data block does not match its stored MD5
    #[error("block hash mismatch for record at {record_offset}: expected {expected}")]
    BlockHash {
        /// Archive-relative record offset
        record_offset: u64,
        /// Stored digest, hex
        expected: String,
    },

    /// The volume name pattern failed to compile
    #[error("volume name pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The blocking open task failed
    #[error("open task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Volume header error
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// Dialect A structure error
    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    /// Dialect B structure error
    #[error(transparent)]
    Sequenced(#[from] SequencedError),

    /// Byte source error
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ArchiveError {
    /// Failure class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingVolume(_)
            | Self::MissingSidecar(_)
            | Self::Directory { .. }
            | Self::Task(_) => ErrorClass::Resource,
            Self::Header(HeaderError::Source(e)) => source_class(e),
            Self::Sidecar(SidecarError::Source(e)) | Self::Sequenced(SequencedError::Source(e)) => {
                source_class(e)
            }
            Self::Sidecar(SidecarError::Inflate(e)) | Self::Sequenced(SequencedError::Inflate(e)) => {
                inflate_class(e)
            }
            Self::Source(e) => source_class(e),
            _ => ErrorClass::FormatViolation,
        }
    }

    /// Whether the error comes from a missing or unreadable file
    pub fn is_resource_error(&self) -> bool {
        self.class() == ErrorClass::Resource
    }
}

fn source_class(error: &SourceError) -> ErrorClass {
    match error {
        SourceError::Open { .. } | SourceError::Io(_) => ErrorClass::Resource,
        _ => ErrorClass::FormatViolation,
    }
}

fn inflate_class(error: &InflateError) -> ErrorClass {
    match error {
        InflateError::Source(e) => source_class(e),
        _ => ErrorClass::FormatViolation,
    }
}
