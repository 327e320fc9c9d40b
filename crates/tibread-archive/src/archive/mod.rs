//! Archive assembly
//!
//! Opening an archive starts from any one of its volume files. The seed
//! volume's header selects the dialect; the dialect-specific assembler then
//! finds the remaining files, checks how they chain together and decodes
//! every slice's metadata. Open either fully succeeds or fails; volumes
//! opened along the way are released when the error propagates.

mod naming;
mod sequenced;
mod sidecar;

pub use naming::{VolumeName, VolumeNamer};

use crate::config::{ConfigDecoder, OpenOptions, RawConfigDecoder};
use crate::content;
use crate::error::{ArchiveError, ArchiveResult};
use crate::slice::Slice;
use crate::tree::{ContentRef, Node, NodeId, NodeKind};
use crate::volume::Volume;
use std::path::{Path, PathBuf};
use tibread_formats::header::Dialect;
use tibread_formats::{ByteSource, ConcatSource, Diagnostics, Warning};
use tracing::{debug, info};

/// Output of a dialect-specific assembler
#[derive(Debug)]
pub(crate) struct Assembled {
    pub(crate) name: String,
    pub(crate) volumes: Vec<Volume>,
    pub(crate) slices: Vec<Slice>,
    /// Concatenated slice data of a dialect B archive
    pub(crate) data: Option<ConcatSource>,
}

/// A fully assembled, read-only backup archive
#[derive(Debug)]
pub struct Archive {
    name: String,
    dialect: Dialect,
    volumes: Vec<Volume>,
    slices: Vec<Slice>,
    data: Option<ConcatSource>,
    options: OpenOptions,
    diagnostics: Diagnostics,
}

impl Archive {
    /// Open the archive containing `path`
    ///
    /// `path` may name any volume of the archive or, for dialect A, its
    /// sidecar metadata file. Configuration text is kept raw.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions) -> ArchiveResult<Self> {
        Self::open_with_decoder(path, options, &RawConfigDecoder)
    }

    /// Open the archive containing `path`, decoding configuration text
    /// through `decoder`
    pub fn open_with_decoder(
        path: impl AsRef<Path>,
        options: &OpenOptions,
        decoder: &dyn ConfigDecoder,
    ) -> ArchiveResult<Self> {
        let path = volume_path(path.as_ref(), &options.sidecar_suffix);
        if !path.is_file() {
            return Err(ArchiveError::MissingVolume(path));
        }

        let mut diagnostics = Diagnostics::new();
        let seed = Volume::open(&path, options, &mut diagnostics)?;
        let dialect = seed.dialect();
        info!("Opening {:?} archive from {}", dialect, path.display());

        let assembled = match dialect {
            Dialect::Sidecar => sidecar::assemble(seed, options, decoder, &mut diagnostics)?,
            Dialect::Sequenced => sequenced::assemble(seed, options, decoder, &mut diagnostics)?,
        };

        info!(
            "Opened archive {:?}: {} volumes, {} slices, {} warnings",
            assembled.name,
            assembled.volumes.len(),
            assembled.slices.len(),
            diagnostics.len()
        );

        Ok(Self {
            name: assembled.name,
            dialect,
            volumes: assembled.volumes,
            slices: assembled.slices,
            data: assembled.data,
            options: options.clone(),
            diagnostics,
        })
    }

    /// Open on a blocking task so async callers keep their executor free
    pub async fn open_async(path: impl Into<PathBuf>, options: OpenOptions) -> ArchiveResult<Self> {
        let path = path.into();
        tokio::task::spawn_blocking(move || Self::open(&path, &options)).await?
    }

    /// Archive name as derived from its file names
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk dialect
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Volumes in sequence order
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Slices in chain order; the first is the base slice
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Slice by index
    pub fn slice(&self, index: usize) -> ArchiveResult<&Slice> {
        self.slices
            .get(index)
            .ok_or(ArchiveError::NoSuchSlice(index))
    }

    /// The slice at `index` followed by each of its ancestors down to the
    /// base slice
    pub fn slice_chain(&self, index: usize) -> ArchiveResult<Vec<&Slice>> {
        let mut chain = vec![self.slice(index)?];
        while let Some(parent) = chain.last().and_then(|s| s.parent()) {
            chain.push(self.slice(parent)?);
        }
        Ok(chain)
    }

    /// Soft integrity issues found while opening
    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    /// Options the archive was opened with
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    fn file_node(&self, slice: usize, node: NodeId) -> ArchiveResult<(&Slice, &Node)> {
        let found = self.slice(slice)?;
        if !found.is_valid() {
            return Err(ArchiveError::UnsupportedSlice(slice));
        }
        let entry = found
            .tree()
            .node(node)
            .ok_or(ArchiveError::NoSuchNode { slice, node })?;
        if entry.kind != NodeKind::File {
            return Err(ArchiveError::NotAFile(node));
        }
        Ok((found, entry))
    }

    /// Read up to `length` bytes at `position` of a regular file
    ///
    /// Reads past the logical size are truncated to it.
    pub fn read_file(
        &self,
        slice: usize,
        node: NodeId,
        position: u64,
        length: u64,
    ) -> ArchiveResult<Vec<u8>> {
        let (found, entry) = self.file_node(slice, node)?;
        let range = content::clamp(position, length, entry.size);
        debug!(
            "Reading {:?} [{}..{}) from slice {}",
            entry.name, range.start, range.end, slice
        );

        match &entry.content {
            ContentRef::None if range.is_empty() => Ok(Vec::new()),
            ContentRef::None => Err(ArchiveError::IncompleteContent {
                covered: 0,
                size: entry.size,
            }),
            ContentRef::Boxes(handles) => {
                let volume = found
                    .volumes()
                    .first()
                    .and_then(|&v| self.volumes.get(v))
                    .and_then(Volume::as_sidecar)
                    .ok_or(ArchiveError::UnsupportedSlice(slice))?;
                let mut diagnostics = Diagnostics::new();
                content::read_boxes(volume, handles, range, &mut diagnostics)
            }
            ContentRef::Records { meta_offset } => {
                let data = self
                    .data
                    .as_ref()
                    .ok_or(ArchiveError::UnsupportedSlice(slice))?;
                let mut view = data.slice(None, None)?;
                content::read_records(
                    view.as_mut(),
                    *meta_offset,
                    entry.size,
                    range,
                    self.options.verify_block_hashes,
                )
            }
        }
    }

    /// Read a whole regular file
    pub fn read_to_end(&self, slice: usize, node: NodeId) -> ArchiveResult<Vec<u8>> {
        let (_, entry) = self.file_node(slice, node)?;
        self.read_file(slice, node, 0, entry.size)
    }

    /// Release every volume
    ///
    /// Dropping the archive has the same effect.
    pub fn close(self) {
        debug!(
            "Closing archive {:?} ({} volumes)",
            self.name,
            self.volumes.len()
        );
    }
}

/// Map a sidecar path back to its volume
fn volume_path(path: &Path, sidecar_suffix: &str) -> PathBuf {
    if sidecar_suffix.is_empty() {
        return path.to_path_buf();
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(sidecar_suffix))
        .map_or_else(|| path.to_path_buf(), |stem| path.with_file_name(stem))
}
