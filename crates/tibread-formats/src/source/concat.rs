//! Several byte sources laid end to end

use super::{BoxedSource, ByteSource, SourceError, SourceResult};

/// Composite source presenting its parts as one contiguous address space
///
/// The offset table is computed from whole part lengths when parts are
/// added, so only whole-source slices can be taken from it.
#[derive(Debug)]
pub struct ConcatSource {
    parts: Vec<BoxedSource>,
    /// Start offset of each part; same length as `parts`
    offsets: Vec<u64>,
    total: u64,
    pos: u64,
}

impl ConcatSource {
    /// Build from parts in address order
    pub fn new(parts: impl IntoIterator<Item = BoxedSource>) -> SourceResult<Self> {
        let mut concat = Self {
            parts: Vec::new(),
            offsets: Vec::new(),
            total: 0,
            pos: 0,
        };
        for part in parts {
            concat.append(part)?;
        }
        Ok(concat)
    }

    /// Add a part after every existing one
    pub fn append(&mut self, mut part: BoxedSource) -> SourceResult<()> {
        let len = part.length()?;
        part.seek(0);
        self.offsets.push(self.total);
        self.parts.push(part);
        self.total += len;
        Ok(())
    }

    /// Number of parts
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Start offset of each part in the combined address space
    pub fn part_offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Index of the part holding `pos`, skipping empty parts
    fn locate(&self, pos: u64) -> usize {
        self.offsets.partition_point(|&start| start <= pos).saturating_sub(1)
    }
}

impl ByteSource for ConcatSource {
    fn pos(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    fn length(&self) -> SourceResult<u64> {
        Ok(self.total)
    }

    fn slice(&self, start: Option<u64>, end: Option<u64>) -> SourceResult<BoxedSource> {
        if start.is_some() || end.is_some() {
            return Err(SourceError::PartialSlice);
        }

        let parts = self
            .parts
            .iter()
            .map(|part| part.slice(None, None))
            .collect::<SourceResult<Vec<_>>>()?;

        Ok(Box::new(Self {
            parts,
            offsets: self.offsets.clone(),
            total: self.total,
            pos: 0,
        }))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> SourceResult<()> {
        let requested = buf.len() as u64;
        if self.pos > self.total || self.total - self.pos < requested {
            return Err(SourceError::Overrun {
                pos: self.pos,
                requested,
                end: self.total,
            });
        }

        let mut filled = 0usize;
        while filled < buf.len() {
            let index = self.locate(self.pos);
            let part_start = self.offsets[index];
            let part_end = self
                .offsets
                .get(index + 1)
                .copied()
                .unwrap_or(self.total);

            let within = self.pos - part_start;
            let available = (part_end - self.pos) as usize;
            let n = available.min(buf.len() - filled);

            let part = &mut self.parts[index];
            part.seek(within);
            part.read_exact_into(&mut buf[filled..filled + n])?;

            filled += n;
            self.pos += n as u64;
        }

        Ok(())
    }

    fn close(self: Box<Self>) {
        for part in self.parts {
            part.close();
        }
    }
}
