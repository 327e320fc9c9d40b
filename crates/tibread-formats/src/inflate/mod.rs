//! Incremental inflate over a byte source
//!
//! Records in both dialects embed deflate streams whose compressed length is
//! not stored anywhere. The decoder feeds the source in fixed blocks and
//! relies on the decompressor reporting the end of the stream, then puts the
//! source cursor right after the last byte the decompressor actually used so
//! the next record can be parsed without a gap.

mod error;

pub use error::{InflateError, InflateResult};

use crate::source::ByteSource;
use bytes::Bytes;
use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

/// Input block size used when the stream length is unknown
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Initial output reservation step
const OUTPUT_STEP: usize = 16 * 1024;

/// Stream framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// zlib header and Adler-32 trailer
    Zlib,
    /// Bare deflate stream
    Raw,
}

/// Output of one decoded stream
#[derive(Debug, Clone)]
pub struct Inflated {
    /// Decompressed bytes
    pub data: Bytes,
    /// Compressed bytes the decompressor consumed
    pub consumed: u64,
}

/// Incremental decompressor for one framing
#[derive(Debug, Clone, Copy)]
pub struct StreamDecoder {
    framing: Framing,
    block_size: usize,
}

impl StreamDecoder {
    /// Decoder for the given framing
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Decoder for zlib streams
    pub const fn zlib() -> Self {
        Self::new(Framing::Zlib)
    }

    /// Decoder for raw deflate streams
    pub const fn raw() -> Self {
        Self::new(Framing::Raw)
    }

    /// Override the input block size
    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = if block_size == 0 { 1 } else { block_size };
        self
    }

    /// Framing this decoder expects
    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Decode one stream starting at the current position
    ///
    /// With `length` set, at most that many compressed bytes are fed and the
    /// stream must end inside them; any trailing bytes are left for the
    /// caller to inspect. Without it the stream is fed block by block up to
    /// the end of the source. Either way the cursor ends up immediately after
    /// the last consumed byte.
    pub fn decode(
        &self,
        source: &mut dyn ByteSource,
        length: Option<u64>,
    ) -> InflateResult<Inflated> {
        let start = source.pos();
        let limit = match length {
            Some(len) => start.saturating_add(len),
            None => source.length()?,
        };

        let mut inflater = Decompress::new(self.framing == Framing::Zlib);
        let mut out: Vec<u8> = Vec::with_capacity(OUTPUT_STEP);
        let mut block = vec![0u8; self.block_size];
        let mut fed = 0u64;

        'feed: loop {
            let available = limit.saturating_sub(start + fed);
            if available == 0 {
                return Err(InflateError::PrematureEnd { start, fed });
            }

            let n = available.min(self.block_size as u64) as usize;
            source.read_exact_into(&mut block[..n])?;
            fed += n as u64;

            let mut input = &block[..n];
            loop {
                if out.capacity() - out.len() < OUTPUT_STEP / 4 {
                    out.reserve(OUTPUT_STEP.max(out.len()));
                }

                let in_before = inflater.total_in();
                let out_before = inflater.total_out();
                let status = inflater
                    .decompress_vec(input, &mut out, FlushDecompress::None)
                    .map_err(|source| InflateError::Decode { start, source })?;

                let used = (inflater.total_in() - in_before) as usize;
                let produced = inflater.total_out() - out_before;
                input = &input[used..];

                if status == Status::StreamEnd {
                    break 'feed;
                }

                let output_full = out.len() == out.capacity();
                if input.is_empty() && !output_full {
                    // Everything fed so far was consumed but the stream is
                    // still open
                    continue 'feed;
                }

                if used == 0 && produced == 0 && !output_full {
                    return Err(InflateError::Stalled {
                        start,
                        consumed: inflater.total_in(),
                    });
                }
            }
        }

        let consumed = inflater.total_in();
        debug_assert!(consumed <= fed);
        source.seek(start + consumed);

        trace!(
            "Inflated {} -> {} bytes at {} ({:?})",
            consumed,
            out.len(),
            start,
            self.framing
        );

        Ok(Inflated {
            data: Bytes::from(out),
            consumed,
        })
    }
}
