//! Memory-mapped file source

use super::{BoxedSource, ByteSource, SourceError, SourceResult, Window};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Mapping shared by every view of one physical file
#[derive(Debug)]
struct MappedFile {
    path: PathBuf,
    map: Mmap,
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        trace!("Releasing mapping of {}", self.path.display());
    }
}

/// Byte source over a memory-mapped physical file
///
/// Cloning or slicing adds a share to the mapping; the mapping is unmapped
/// and the handle closed when the last view is dropped.
#[derive(Debug, Clone)]
pub struct FileSource {
    file: Arc<MappedFile>,
    window: Window,
}

impl FileSource {
    /// Map a file read-only; the window covers the whole file
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let open_err = |source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;

        // Backup volumes are never written while being read
        #[allow(unsafe_code)]
        let map = unsafe { MmapOptions::new().map(&file).map_err(open_err)? };

        trace!("Mapped {} ({} bytes)", path.display(), map.len());

        let window = Window::whole(map.len() as u64);
        Ok(Self {
            file: Arc::new(MappedFile {
                path: path.to_path_buf(),
                map,
            }),
            window,
        })
    }

    /// Path of the mapped file
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Number of live views sharing this file's mapping
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.file)
    }

    /// Typed slice that keeps the concrete source type
    pub fn sub_source(&self, start: Option<u64>, end: Option<u64>) -> SourceResult<Self> {
        Ok(Self {
            file: Arc::clone(&self.file),
            window: self.window.sub(start, end)?,
        })
    }
}

impl ByteSource for FileSource {
    fn pos(&self) -> u64 {
        self.window.pos()
    }

    fn seek(&mut self, pos: u64) {
        self.window.seek(pos);
    }

    fn length(&self) -> SourceResult<u64> {
        Ok(self.window.len())
    }

    fn slice(&self, start: Option<u64>, end: Option<u64>) -> SourceResult<BoxedSource> {
        Ok(Box::new(self.sub_source(start, end)?))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> SourceResult<()> {
        let range = self.window.take(buf.len())?;
        buf.copy_from_slice(&self.file.map[range]);
        Ok(())
    }
}
