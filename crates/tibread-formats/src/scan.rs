//! Bounded forward search for a byte pattern

use crate::source::{ByteSource, SourceResult};

const SCAN_BLOCK: usize = 4096;

/// Position of the first occurrence of `needle` in `haystack`
pub fn find_in(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Search `source` for `needle` starting at `from` and ending before `limit`
///
/// The whole pattern must fit before `limit`. Returns the position of the
/// first match, or `None` when the bounded region does not contain it. The
/// source cursor is left unspecified.
pub fn find_forward(
    source: &mut dyn ByteSource,
    needle: &[u8],
    from: u64,
    limit: u64,
) -> SourceResult<Option<u64>> {
    let limit = limit.min(source.length()?);
    if needle.is_empty() {
        return Ok((from <= limit).then_some(from));
    }

    let overlap = needle.len() - 1;
    let mut block_start = from;
    let mut carry: Vec<u8> = Vec::with_capacity(SCAN_BLOCK + overlap);

    while block_start < limit {
        let n = (limit - block_start).min(SCAN_BLOCK as u64) as usize;
        source.seek(block_start);
        let block = source.read_bytes(n)?;

        // `carry` holds the tail of the previous block so matches spanning
        // two blocks are found
        let carried = carry.len();
        carry.extend_from_slice(&block);
        if let Some(at) = find_in(&carry, needle) {
            return Ok(Some(block_start - carried as u64 + at as u64));
        }

        let keep = carry.len().min(overlap);
        carry.drain(..carry.len() - keep);
        block_start += n as u64;
    }

    Ok(None)
}
