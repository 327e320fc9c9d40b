//! Seekable, sliceable byte sources
//!
//! Every decoder in this crate reads through [`ByteSource`]. A source is a
//! cursor over an immutable window `[start, end)` of some backing resource.
//! [`ByteSource::slice`] hands out a new, independently positioned view that
//! shares the backing resource; the resource is released once the last view
//! referencing it is dropped.
//!
//! Three implementations exist:
//!
//! - [`FileSource`]: a memory-mapped physical file
//! - [`MemorySource`]: a shared in-memory buffer (decompressed chunks)
//! - [`ConcatSource`]: several sources laid end to end as one address space
//!
//! All integer reads are little-endian.

mod concat;
mod cursor;
mod error;
mod file;
mod memory;

pub use concat::ConcatSource;
pub use cursor::SourceReader;
pub use error::{SourceError, SourceResult};
pub use file::FileSource;
pub use memory::MemorySource;

use std::fmt;
use std::ops::Range;

/// Owned, type-erased byte source
pub type BoxedSource = Box<dyn ByteSource>;

/// Random-access reader over a bounded byte window
///
/// Positions are relative to the start of the window. Seeking past the end
/// is allowed; the next read fails with [`SourceError::Overrun`].
pub trait ByteSource: Send + Sync + fmt::Debug {
    /// Current position relative to the window start
    fn pos(&self) -> u64;

    /// Move to an absolute position within the window
    fn seek(&mut self, pos: u64);

    /// Move by a signed distance
    fn skip(&mut self, delta: i64) -> SourceResult<()> {
        let pos = self.pos();
        let target = pos
            .checked_add_signed(delta)
            .ok_or(SourceError::SeekBeforeStart { pos, delta })?;
        self.seek(target);
        Ok(())
    }

    /// Total length of the window
    fn length(&self) -> SourceResult<u64>;

    /// New view over `[start, end)` of this window with its own cursor
    ///
    /// `None` bounds default to the start and end of this window.
    fn slice(&self, start: Option<u64>, end: Option<u64>) -> SourceResult<BoxedSource>;

    /// Fill `buf` completely from the current position
    fn read_exact_into(&mut self, buf: &mut [u8]) -> SourceResult<()>;

    /// Read exactly `len` bytes
    ///
    /// Lengths come straight from the data, so they are checked against the
    /// window before anything is allocated.
    fn read_bytes(&mut self, len: usize) -> SourceResult<Vec<u8>> {
        let requested = len as u64;
        if requested > self.remaining()? {
            return Err(SourceError::Overrun {
                pos: self.pos(),
                requested,
                end: self.length()?,
            });
        }
        let mut buf = vec![0u8; len];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }

    /// Read one byte
    fn read_u8(&mut self) -> SourceResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian u16
    fn read_u16(&mut self) -> SourceResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian 24-bit unsigned integer
    fn read_u24(&mut self) -> SourceResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_into(&mut buf[..3])?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian u32
    fn read_u32(&mut self) -> SourceResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read an 8-byte little-endian field keeping its low 48 bits
    ///
    /// The format never stores values wider than 48 bits in these fields.
    fn read_u64(&mut self) -> SourceResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf) & 0x0000_FFFF_FFFF_FFFF)
    }

    /// Read `chars` UTF-16LE code units as a string
    ///
    /// Unpaired surrogates are replaced rather than rejected; names in real
    /// archives are not always well formed.
    fn read_utf16(&mut self, chars: usize) -> SourceResult<String> {
        let raw = self.read_bytes(chars.saturating_mul(2))?;
        Ok(decode_utf16le(&raw))
    }

    /// Bytes left between the cursor and the window end
    fn remaining(&self) -> SourceResult<u64> {
        Ok(self.length()?.saturating_sub(self.pos()))
    }

    /// Release this view's share of the backing resource
    fn close(self: Box<Self>) {}
}

/// Decode UTF-16LE bytes, dropping a leading byte order mark
pub fn decode_utf16le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let units = match units.first() {
        Some(0xFEFF) => &units[1..],
        _ => &units[..],
    };
    String::from_utf16_lossy(units)
}

/// Cursor bookkeeping shared by the flat sources
///
/// All fields are absolute offsets into the backing buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    start: u64,
    end: u64,
    pos: u64,
}

impl Window {
    pub(crate) const fn whole(len: u64) -> Self {
        Self {
            start: 0,
            end: len,
            pos: 0,
        }
    }

    pub(crate) const fn len(&self) -> u64 {
        self.end - self.start
    }

    pub(crate) const fn pos(&self) -> u64 {
        self.pos - self.start
    }

    pub(crate) const fn bounds(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub(crate) const fn seek(&mut self, pos: u64) {
        self.pos = self.start.saturating_add(pos);
    }

    /// Child window; bounds are relative to this window's start
    pub(crate) fn sub(&self, start: Option<u64>, end: Option<u64>) -> SourceResult<Self> {
        let len = self.len();
        let rel_start = start.unwrap_or(0);
        let rel_end = end.unwrap_or(len);
        if rel_start > rel_end || rel_end > len {
            return Err(SourceError::InvalidRange {
                start: rel_start,
                end: rel_end,
                len,
            });
        }

        Ok(Self {
            start: self.start + rel_start,
            end: self.start + rel_end,
            pos: self.start + rel_start,
        })
    }

    /// Claim the next `n` bytes and advance past them
    pub(crate) fn take(&mut self, n: usize) -> SourceResult<Range<usize>> {
        let requested = n as u64;
        if self.pos > self.end || self.end - self.pos < requested {
            return Err(SourceError::Overrun {
                pos: self.pos(),
                requested,
                end: self.len(),
            });
        }

        let range = self.pos as usize..(self.pos + requested) as usize;
        self.pos += requested;
        Ok(range)
    }
}
