//! Archive assembly for True Image backups
//!
#![allow(clippy::cast_possible_truncation)] // Offsets fit the platform's address space
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
//! Builds on `tibread-formats` to open whole archives: every volume file of
//! a backup series, every slice (backup generation) stored in them, and a
//! read-only file tree per slice with random-access content reads.
//!
//! # Dialects
//!
//! - **Sidecar** (dialect A): one data volume and a `.metadata` file next to
//!   it. Each metadata box in the sidecar describes one slice.
//! - **Sequenced** (dialect B): sibling volumes named
//!   `<name>_<strategy>_b<backup>_s<slice>_v<volume>.tib`, chained by header
//!   sequence numbers.
//!
//! # Example
//!
//! ```no_run
//! use tibread_archive::{Archive, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = Archive::open("backups/Docs_full_b1_s1_v1.tib", &OpenOptions::default())?;
//! for slice in archive.slices() {
//!     let tree = slice.tree();
//!     if let Some(node) = tree.resolve("docs/report.txt") {
//!         let bytes = archive.read_to_end(slice.index(), node)?;
//!         println!("{} bytes", bytes.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Soft integrity issues found while opening are available from
//! [`Archive::warnings`]; structural violations fail the open.

#![warn(missing_docs)]

pub mod archive;
pub mod config;
mod content;
pub mod error;
pub mod slice;
pub mod tree;
pub mod volume;

pub use archive::Archive;
pub use config::{ConfigDecoder, ConfigText, OpenOptions, RawConfigDecoder};
pub use error::{ArchiveError, ArchiveResult, ErrorClass};
pub use slice::{ProductInfo, RawConfig, Slice, SliceConfig};
pub use tree::{ContentRef, FileTree, Node, NodeId, NodeKind};
pub use volume::{Footer, SequencedVolume, SidecarVolume, Volume};

pub use tibread_formats::{Diagnostics, Dialect, Timestamp, Warning};
