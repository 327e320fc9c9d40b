//! Adler-32 as used by volume headers
//!
//! Headers store the Adler-32 of their own bytes with the checksum field
//! itself treated as zero.
//!
//! ```
//! use tibread_formats::checksum::adler32;
//!
//! assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
//! ```

use adler2::Adler32;
use std::ops::Range;

/// Byte range of the checksum field inside a volume header
pub const HEADER_CHECKSUM_FIELD: Range<usize> = 0x18..0x1C;

/// Compute the Adler-32 checksum of `data`
pub fn adler32(data: &[u8]) -> u32 {
    adler2::adler32_slice(data)
}

/// Checksum of a raw header with the checksum field zeroed
///
/// `header` must span exactly the declared header length. Headers shorter
/// than the checksum field are summed as-is.
pub fn header_checksum(header: &[u8]) -> u32 {
    if header.len() < HEADER_CHECKSUM_FIELD.end {
        return adler32(header);
    }

    let mut hasher = Adler32::new();
    hasher.write_slice(&header[..HEADER_CHECKSUM_FIELD.start]);
    hasher.write_slice(&[0; 4]);
    hasher.write_slice(&header[HEADER_CHECKSUM_FIELD.end..]);
    hasher.checksum()
}

/// Whether the checksum stored in `header` matches its contents
pub fn verify_header(header: &[u8]) -> bool {
    header
        .get(HEADER_CHECKSUM_FIELD)
        .and_then(|field| field.try_into().ok())
        .is_some_and(|field: [u8; 4]| u32::from_le_bytes(field) == header_checksum(header))
}
