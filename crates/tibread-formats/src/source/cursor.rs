//! `std::io` adapter so binrw can parse straight from a byte source

use super::ByteSource;
use std::io::{self, Read, Seek, SeekFrom};

/// Borrowing `Read + Seek` view over a [`ByteSource`]
///
/// Reads are clamped to the window end instead of failing, as `Read`
/// requires; binrw reports the short read itself.
pub struct SourceReader<'a> {
    inner: &'a mut dyn ByteSource,
}

impl<'a> SourceReader<'a> {
    /// Wrap a source; the source cursor is shared, not copied
    pub fn new(inner: &'a mut dyn ByteSource) -> Self {
        Self { inner }
    }
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.inner.remaining().map_err(io::Error::other)?;
        let n = buf.len().min(remaining as usize);
        self.inner
            .read_exact_into(&mut buf[..n])
            .map_err(io::Error::other)?;
        Ok(n)
    }
}

impl Seek for SourceReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.inner.pos().checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let len = self.inner.length().map_err(io::Error::other)?;
                len.checked_add_signed(delta)
            }
        };

        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of source")
        })?;
        self.inner.seek(target);
        Ok(target)
    }
}
