//! In-memory byte source

use super::{BoxedSource, ByteSource, SourceResult, Window};
use bytes::Bytes;

/// Byte source over a reference-counted buffer
///
/// Slices share the same [`Bytes`] allocation, so handing out views of a
/// decompressed chunk never copies it.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    window: Window,
}

impl MemorySource {
    /// Wrap a buffer; the window covers all of it
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let window = Window::whole(data.len() as u64);
        Self { data, window }
    }

    /// The bytes visible through this window
    pub fn as_bytes(&self) -> Bytes {
        self.data.slice(self.window.bounds())
    }
}

impl ByteSource for MemorySource {
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
        Ok(Box::new(Self {
            data: self.data.clone(),
            window: self.window.sub(start, end)?,
        }))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> SourceResult<()> {
        let range = self.window.take(buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::source::SourceError;

    #[test]
    fn test_slices_have_independent_cursors() {
        let mut source = MemorySource::new((0u8..32).collect::<Vec<_>>());
        source.seek(10);

        let mut view = source.slice(Some(4), Some(8)).unwrap();
        assert_eq!(view.pos(), 0);
        assert_eq!(view.length().unwrap(), 4);
        assert_eq!(view.read_bytes(4).unwrap(), vec![4, 5, 6, 7]);

        // The parent cursor is untouched
        assert_eq!(source.pos(), 10);
        assert_eq!(source.read_u8().unwrap(), 10);
    }

    #[test]
    fn test_read_past_window_end_fails() {
        let source = MemorySource::new(vec![1u8, 2, 3, 4]);
        let mut view = source.slice(Some(1), Some(3)).unwrap();
        view.seek(1);
        match view.read_bytes(2) {
            Err(SourceError::Overrun { pos, requested, end }) => {
                assert_eq!((pos, requested, end), (1, 2, 2));
            }
            other => panic!("expected overrun, got {other:?}"),
        }
    }

    #[test]
    fn test_as_bytes_follows_window() {
        let source = MemorySource::new(vec![9u8, 8, 7, 6, 5]);
        let view = source.slice(Some(1), Some(4)).unwrap();
        let mut copy = view.slice(None, None).unwrap();
        assert_eq!(copy.read_bytes(3).unwrap(), vec![8, 7, 6]);
        assert_eq!(source.as_bytes().as_ref(), &[9, 8, 7, 6, 5]);
    }
}
