//! Physical volume files
//!
//! Opening a volume maps the file, reads and checks its header, then picks
//! the dialect-specific volume type. A magic mismatch or unknown dialect is
//! fatal; checksum and sanity failures only lower trust in the volume.

mod sequenced;
mod sidecar;

pub use sequenced::SequencedVolume;
pub use sidecar::SidecarVolume;

use crate::config::OpenOptions;
use crate::error::ArchiveResult;
use std::path::Path;
use tibread_formats::header::{Dialect, HeaderCheck};
use tibread_formats::sequenced::VolumeFooter;
use tibread_formats::sidecar::ContainerRecord;
use tibread_formats::{Diagnostics, FileSource, VolumeHeader};
use tracing::debug;

/// State shared by both volume types
#[derive(Debug)]
pub(crate) struct VolumeFile {
    pub(crate) source: FileSource,
    pub(crate) header: VolumeHeader,
    pub(crate) check: HeaderCheck,
    pub(crate) dialect: Dialect,
}

impl VolumeFile {
    fn open(path: &Path, options: &OpenOptions, diag: &mut Diagnostics) -> ArchiveResult<Self> {
        let mut source = FileSource::open(path)?;
        let header = VolumeHeader::read_from(&mut source)?;
        let dialect = header.dialect()?;
        let check = header.check(diag, options.strict_checksums)?;

        debug!(
            "Opened {} as {:?} volume (sequence {}, trusted: {})",
            path.display(),
            dialect,
            header.sequence,
            check.is_trusted()
        );

        Ok(Self {
            source,
            header,
            check,
            dialect,
        })
    }

    /// Offset of the first data byte
    pub(crate) fn data_start(&self) -> u64 {
        self.dialect.data_start(&self.header)
    }
}

/// What a volume's footer points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    /// Final container record of a dialect A volume
    Record(ContainerRecord),
    /// Slice footer of a dialect B volume
    Slice(VolumeFooter),
}

/// One opened volume file
#[derive(Debug)]
pub enum Volume {
    /// Dialect A data volume
    Sidecar(SidecarVolume),
    /// Dialect B volume
    Sequenced(SequencedVolume),
}

impl Volume {
    /// Open a volume file and dispatch on its dialect
    pub fn open(
        path: impl AsRef<Path>,
        options: &OpenOptions,
        diag: &mut Diagnostics,
    ) -> ArchiveResult<Self> {
        let file = VolumeFile::open(path.as_ref(), options, diag)?;
        Ok(match file.dialect {
            Dialect::Sidecar => Self::Sidecar(SidecarVolume::new(file, options.chunk_cache)),
            Dialect::Sequenced => Self::Sequenced(SequencedVolume::new(file)),
        })
    }

    fn file(&self) -> &VolumeFile {
        match self {
            Self::Sidecar(v) => &v.file,
            Self::Sequenced(v) => &v.file,
        }
    }

    /// Parsed header
    pub fn header(&self) -> &VolumeHeader {
        &self.file().header
    }

    /// Dialect of the volume
    pub fn dialect(&self) -> Dialect {
        self.file().dialect
    }

    /// Path of the volume file
    pub fn path(&self) -> &Path {
        self.file().source.path()
    }

    /// Offset of the first data byte in the file
    pub fn data_start(&self) -> u64 {
        self.file().data_start()
    }

    /// Header length, block size and sequence match the dialect's usual values
    pub fn validate_header(&self) -> bool {
        self.file().check.sane
    }

    /// Header checksum is valid and the header is sane
    pub fn is_trusted(&self) -> bool {
        self.file().check.is_trusted()
    }

    /// Read the footer without scanning the volume
    pub fn read_footer(&self, diag: &mut Diagnostics) -> ArchiveResult<Footer> {
        match self {
            Self::Sidecar(v) => v.read_last_record(diag).map(Footer::Record),
            Self::Sequenced(v) => v.read_footer().map(Footer::Slice),
        }
    }

    /// Dialect A view of this volume
    pub fn as_sidecar(&self) -> Option<&SidecarVolume> {
        match self {
            Self::Sidecar(v) => Some(v),
            Self::Sequenced(_) => None,
        }
    }

    /// Dialect B view of this volume
    pub fn as_sequenced(&self) -> Option<&SequencedVolume> {
        match self {
            Self::Sequenced(v) => Some(v),
            Self::Sidecar(_) => None,
        }
    }
}
