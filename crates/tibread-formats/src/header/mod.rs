//! Volume header shared by both dialects
//!
//! ```text
//! 0x00  u32   magic (0xA2B924CE)
//! 0x04  u16   header length
//! 0x06  u16   dialect tag
//! 0x08  [4]   archive key
//! 0x0C  [4]   slice key
//! 0x10  [4]   volume key
//! 0x14  u32   sequence
//! 0x18  u32   Adler-32 of the header with this field zeroed
//! 0x1C  u32   block size
//! ```
//!
//! Dialect A headers carry four more bytes of unknown meaning; they are
//! covered by the checksum but otherwise ignored.

mod error;

pub use error::{HeaderError, HeaderResult};

use crate::checksum::header_checksum;
use crate::diagnostics::{Diagnostics, Warning};
use crate::source::{ByteSource, SourceReader};
use binrw::BinRead;
use tracing::debug;

/// Magic value at the start of every volume file
pub const VOLUME_MAGIC: u32 = 0xA2B9_24CE;

/// Size of the fixed header fields
pub const FIXED_HEADER_LEN: u16 = 0x20;

/// On-disk dialect selected by the header's dialect tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Dialect {
    /// Filename-sequenced multi-volume archives with typed records
    Sequenced = 0,
    /// Single data volume plus a sidecar metadata file
    Sidecar = 1,
}

impl Dialect {
    /// Map a raw dialect tag
    pub const fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Self::Sequenced),
            1 => Some(Self::Sidecar),
            _ => None,
        }
    }

    /// Header length this dialect normally writes
    pub const fn expected_header_len(self) -> u16 {
        match self {
            Self::Sequenced => 0x20,
            Self::Sidecar => 0x24,
        }
    }

    /// Block size this dialect normally writes
    pub const fn expected_block_size(self) -> u32 {
        match self {
            Self::Sequenced => 32,
            Self::Sidecar => 4096,
        }
    }

    /// Offset of the first data byte in a volume file
    pub const fn data_start(self, header: &VolumeHeader) -> u64 {
        match self {
            Self::Sequenced => header.header_len as u64,
            Self::Sidecar => 3 * header.block_size as u64,
        }
    }
}

/// Parsed volume header
#[derive(BinRead, Debug, Clone, PartialEq, Eq)]
#[br(little)]
pub struct VolumeHeader {
    /// Volume magic
    #[br(assert(magic == VOLUME_MAGIC))]
    pub magic: u32,
    /// Declared header length
    pub header_len: u16,
    /// Raw dialect tag
    pub dialect_tag: u16,
    /// Key shared by every file of one archive
    pub archive_key: [u8; 4],
    /// Key of the slice this volume starts in
    pub slice_key: [u8; 4],
    /// Key of this volume
    pub volume_key: [u8; 4],
    /// Ordinal of this file among all files ever written for the archive
    pub sequence: u32,
    /// Stored Adler-32
    pub checksum: u32,
    /// Record alignment
    pub block_size: u32,
    /// Adler-32 recomputed over the header bytes
    #[br(ignore)]
    pub computed_checksum: u32,
}

/// Result of checking a header against its checksum and its dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCheck {
    /// Stored checksum matches the header bytes
    pub checksum_valid: bool,
    /// Length, block size and sequence look like the dialect's usual values
    pub sane: bool,
}

impl HeaderCheck {
    /// Both checks passed
    pub const fn is_trusted(&self) -> bool {
        self.checksum_valid && self.sane
    }
}

impl VolumeHeader {
    /// Read the header at the start of `source`
    ///
    /// A magic mismatch or an impossible header length is fatal. The
    /// checksum is recomputed but not enforced; see [`VolumeHeader::check`].
    /// The cursor is left at the end of the header.
    pub fn read_from(source: &mut dyn ByteSource) -> HeaderResult<Self> {
        source.seek(0);
        let magic = source.read_u32()?;
        if magic != VOLUME_MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        source.seek(0);
        let mut header = Self::read(&mut SourceReader::new(source))?;
        if header.header_len < FIXED_HEADER_LEN {
            return Err(HeaderError::InvalidLength(header.header_len));
        }

        source.seek(0);
        let raw = source.read_bytes(header.header_len as usize)?;
        header.computed_checksum = header_checksum(&raw);

        debug!(
            "Volume header: dialect {}, sequence {}, archive key {}",
            header.dialect_tag,
            header.sequence,
            hex::encode(header.archive_key)
        );

        Ok(header)
    }

    /// Dialect declared by the header
    pub fn dialect(&self) -> HeaderResult<Dialect> {
        Dialect::from_tag(self.dialect_tag).ok_or(HeaderError::UnknownDialect(self.dialect_tag))
    }

    /// Whether the stored checksum matches the header bytes
    pub const fn checksum_valid(&self) -> bool {
        self.checksum == self.computed_checksum
    }

    /// Describe the first way the header departs from its dialect's usual
    /// values, if any
    pub fn sanity_issue(&self, dialect: Dialect) -> Option<String> {
        if self.header_len != dialect.expected_header_len() {
            return Some(format!(
                "header length {:#x}, expected {:#x}",
                self.header_len,
                dialect.expected_header_len()
            ));
        }
        if self.block_size != dialect.expected_block_size() {
            return Some(format!(
                "block size {}, expected {}",
                self.block_size,
                dialect.expected_block_size()
            ));
        }
        // Sidecar archives are always a single data volume
        if dialect == Dialect::Sidecar && self.sequence != 1 {
            return Some(format!("sequence {}, expected 1", self.sequence));
        }
        None
    }

    /// Check the checksum and dialect sanity, recording soft failures
    ///
    /// With `strict_checksums` a checksum mismatch is an error instead of a
    /// warning.
    pub fn check(
        &self,
        diag: &mut Diagnostics,
        strict_checksums: bool,
    ) -> HeaderResult<HeaderCheck> {
        let dialect = self.dialect()?;

        let checksum_valid = self.checksum_valid();
        if !checksum_valid {
            if strict_checksums {
                return Err(HeaderError::ChecksumMismatch {
                    stored: self.checksum,
                    computed: self.computed_checksum,
                });
            }
            diag.push(Warning::HeaderChecksum {
                stored: self.checksum,
                computed: self.computed_checksum,
            });
        }

        let issue = self.sanity_issue(dialect);
        let sane = issue.is_none();
        if let Some(reason) = issue {
            diag.push(Warning::HeaderSanity { dialect, reason });
        }

        Ok(HeaderCheck {
            checksum_valid,
            sane,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::checksum::HEADER_CHECKSUM_FIELD;
    use crate::source::MemorySource;

    fn header_bytes(dialect: Dialect, sequence: u32) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&VOLUME_MAGIC.to_le_bytes());
        raw.extend_from_slice(&dialect.expected_header_len().to_le_bytes());
        raw.extend_from_slice(&(dialect as u16).to_le_bytes());
        raw.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        raw.extend_from_slice(&sequence.to_le_bytes());
        raw.extend_from_slice(&[0; 4]);
        raw.extend_from_slice(&dialect.expected_block_size().to_le_bytes());
        raw.resize(dialect.expected_header_len() as usize, 0);

        let sum = header_checksum(&raw);
        raw[HEADER_CHECKSUM_FIELD].copy_from_slice(&sum.to_le_bytes());
        raw
    }

    #[test]
    fn test_parse_sequenced_header() {
        let mut source = MemorySource::new(header_bytes(Dialect::Sequenced, 2));
        let header = VolumeHeader::read_from(&mut source).unwrap();

        assert_eq!(header.dialect().unwrap(), Dialect::Sequenced);
        assert_eq!(header.archive_key, [1, 2, 3, 4]);
        assert_eq!(header.volume_key, [9, 10, 11, 12]);
        assert_eq!(header.sequence, 2);
        assert_eq!(source.pos(), 0x20);
        assert_eq!(Dialect::Sequenced.data_start(&header), 0x20);

        let mut diag = Diagnostics::new();
        let check = header.check(&mut diag, true).unwrap();
        assert!(check.is_trusted());
        assert!(diag.is_empty());
    }

    #[test]
    fn test_sidecar_layout() {
        let mut source = MemorySource::new(header_bytes(Dialect::Sidecar, 1));
        let header = VolumeHeader::read_from(&mut source).unwrap();
        assert_eq!(header.header_len, 0x24);
        assert_eq!(Dialect::Sidecar.data_start(&header), 3 * 4096);
        assert!(header.checksum_valid());
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let mut raw = header_bytes(Dialect::Sequenced, 1);
        raw[0] ^= 0xFF;
        let mut source = MemorySource::new(raw);
        assert!(matches!(
            VolumeHeader::read_from(&mut source),
            Err(HeaderError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_checksum_mismatch_is_soft_unless_strict() {
        let mut raw = header_bytes(Dialect::Sequenced, 1);
        raw[0x0C] ^= 0x01;
        let mut source = MemorySource::new(raw);
        let header = VolumeHeader::read_from(&mut source).unwrap();

        let mut diag = Diagnostics::new();
        let check = header.check(&mut diag, false).unwrap();
        assert!(!check.checksum_valid);
        assert!(!check.is_trusted());
        assert!(matches!(
            diag.warnings(),
            [Warning::HeaderChecksum { .. }]
        ));

        assert!(matches!(
            header.check(&mut Diagnostics::new(), true),
            Err(HeaderError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_sidecar_sequence_must_be_one() {
        let mut source = MemorySource::new(header_bytes(Dialect::Sidecar, 3));
        let header = VolumeHeader::read_from(&mut source).unwrap();

        let mut diag = Diagnostics::new();
        let check = header.check(&mut diag, false).unwrap();
        assert!(check.checksum_valid);
        assert!(!check.sane);
        match diag.warnings() {
            [Warning::HeaderSanity { dialect, reason }] => {
                assert_eq!(*dialect, Dialect::Sidecar);
                assert!(reason.contains("sequence 3"));
            }
            other => panic!("unexpected warnings {other:?}"),
        }
    }

    #[test]
    fn test_unknown_dialect() {
        let mut raw = header_bytes(Dialect::Sequenced, 1);
        raw[6] = 7;
        let mut source = MemorySource::new(raw);
        let header = VolumeHeader::read_from(&mut source).unwrap();
        assert!(matches!(
            header.dialect(),
            Err(HeaderError::UnknownDialect(7))
        ));
    }
}
