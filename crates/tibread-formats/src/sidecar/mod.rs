//! Records, chunks, boxes and file entries of dialect A
//!
//! Offsets in a [`BoxHandle`] are relative to the volume's data start for
//! the record, and to the decompressed chunk for the box. Everything else in
//! this module uses offsets within the source it was read from.

pub mod boxes;
pub mod chunk;
pub mod entry;
mod error;
pub mod handle;
pub mod metadata;
pub mod metafile;
pub mod record;

pub use boxes::{Attribute, BoxBody, BoxTag, ChunkBox};
pub use chunk::Chunk;
pub use entry::{EntryKind, FileEntry};
pub use error::{SidecarError, SidecarResult};
pub use handle::BoxHandle;
pub use metadata::MetaDataBox;
pub use metafile::SidecarFile;
pub use record::ContainerRecord;
