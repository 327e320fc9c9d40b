//! Decoders for True Image backup volume structures
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::derive_partial_eq_without_eq)] // Binary format structs
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
//! This crate decodes the two known on-disk dialects of True Image backup
//! volumes into typed structures. It does not know about archives made of
//! several files; that assembly lives in `tibread-archive`.
//!
//! # Layers
//!
//! - **Source**: seekable, sliceable byte sources over mapped files, shared
//!   memory buffers, or several sources laid end to end
//! - **Inflate**: incremental zlib/raw-deflate decoding that reports exactly
//!   how many compressed bytes were consumed
//! - **Header**: the volume header shared by both dialects
//! - **Sidecar**: dialect A records, chunks, boxes and file entries
//! - **Sequenced**: dialect B records, listings, record indexes, footers and
//!   slice trailers
//!
//! # Offsets
//!
//! Offsets in this format are relative to several base points: the file
//! start, the end of the volume header, a record start, a chunk start or the
//! start of a decompressed box. Every type documents which one it uses.

#![warn(missing_docs)]

/// Adler-32 checksum used by volume headers
pub mod checksum;
/// Structured collection of soft integrity issues found while parsing
pub mod diagnostics;
/// Volume header shared by both dialects
pub mod header;
/// Incremental zlib and raw-deflate decoding over a byte source
pub mod inflate;
/// Bounded byte-pattern search
pub mod scan;
/// Dialect B: type-tagged records read straight from a stream
///
/// Each record starts with a one byte tag followed by a compressed payload.
/// Volumes of this dialect are split by file name and linked by header
/// sequence numbers; a footer at the end of each slice points back at the
/// slice trailer and its metadata.
pub mod sequenced;
/// Dialect A: single-chunk records holding trees of typed boxes
///
/// Volumes of this dialect are a single data file plus a sidecar metadata
/// file. Both are built from block-aligned container records whose payload
/// decompresses to a chunk of boxes.
pub mod sidecar;
pub mod source;
pub mod time;

pub use diagnostics::{Diagnostics, Warning};
pub use header::{Dialect, HeaderError, VOLUME_MAGIC, VolumeHeader};
pub use source::{BoxedSource, ByteSource, ConcatSource, FileSource, MemorySource, SourceError};
pub use time::Timestamp;
