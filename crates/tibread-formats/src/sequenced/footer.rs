//! Volume footers and slice trailers
//!
//! The last volume of every slice ends with a 16-byte footer pointing at the
//! slice trailer. The trailer in turn points at the slice's metadata records.
//! Both offsets are archive-relative: they address the concatenated data of
//! every slice, in slice order.

use super::error::{SequencedError, SequencedResult};
use super::record::{Record, RecordType};
use crate::diagnostics::{Diagnostics, Warning};
use crate::source::{ByteSource, SourceReader};
use crate::time::Timestamp;
use binrw::BinRead;
use tracing::debug;

/// Size of a volume footer
pub const FOOTER_LEN: u64 = 16;

const LOW_48_BITS: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Trailing 16 bytes of a slice's last volume
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct VolumeFooter {
    /// Slice data bytes across all of the slice's volumes, footer excluded
    #[br(map = |v: u64| v & LOW_48_BITS)]
    pub slice_length: u64,
    /// Archive-relative offset of the slice trailer
    #[br(map = |v: u64| v & LOW_48_BITS)]
    pub trailer_offset: u64,
}

impl VolumeFooter {
    /// Decode the footer from the last bytes of a volume's data window
    pub fn read_from(source: &mut dyn ByteSource) -> SequencedResult<Self> {
        let len = source.length()?;
        if len < FOOTER_LEN {
            return Err(SequencedError::FooterTooShort { len });
        }
        source.seek(len - FOOTER_LEN);
        let footer = Self::read(&mut SourceReader::new(source))?;
        debug!(
            "Volume footer: slice length {}, trailer at {}",
            footer.slice_length, footer.trailer_offset
        );
        Ok(footer)
    }
}

/// Trailer form values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceForm {
    /// File-level backup
    FileLevel,
    /// Sector-by-sector image; not decodable
    SectorBySector,
    /// Unrecognised form value
    Other(u32),
}

impl SliceForm {
    /// Map a raw form value
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::FileLevel,
            1 => Self::SectorBySector,
            other => Self::Other(other),
        }
    }

    /// Raw form value
    pub const fn raw(self) -> u32 {
        match self {
            Self::FileLevel => 0,
            Self::SectorBySector => 1,
            Self::Other(raw) => raw,
        }
    }
}

#[derive(BinRead, Debug)]
#[br(little)]
struct FileLevelFields {
    slice_id: [u8; 16],
    #[br(map = |v: u64| v & LOW_48_BITS)]
    created: u64,
    #[br(map = |v: u64| v & LOW_48_BITS)]
    metadata_offset: u64,
}

/// Decoded slice trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceTrailer {
    /// File-level slice with decodable metadata
    FileLevel {
        /// Slice UUID
        slice_id: [u8; 16],
        /// Slice creation time
        created: Timestamp,
        /// Archive-relative offset of the first metadata record
        metadata_offset: u64,
    },
    /// Slice form without a decoder; the slice cannot be listed
    Unsupported {
        /// Form found in the trailer
        form: SliceForm,
    },
}

impl SliceTrailer {
    /// Decode the trailer at the cursor
    ///
    /// Unsupported forms are reported to `diag` rather than failing, so the
    /// rest of the archive stays readable.
    pub fn read(source: &mut dyn ByteSource, diag: &mut Diagnostics) -> SequencedResult<Self> {
        let record = Record::read(source)?;
        if record.kind != RecordType::EndTrailer {
            return Err(SequencedError::UnexpectedRecord {
                offset: record.start,
                expected: "end trailer",
                found: record.kind.tag(),
            });
        }

        let form = SliceForm::from_raw(source.read_u32()?);
        if form != SliceForm::FileLevel {
            diag.push(Warning::UnsupportedSliceForm { form: form.raw() });
            return Ok(Self::Unsupported { form });
        }

        let fields = FileLevelFields::read(&mut SourceReader::new(source))?;
        Ok(Self::FileLevel {
            slice_id: fields.slice_id,
            created: Timestamp::from_millis(fields.created),
            metadata_offset: fields.metadata_offset,
        })
    }

    /// Metadata offset for file-level slices
    pub const fn metadata_offset(&self) -> Option<u64> {
        match self {
            Self::FileLevel {
                metadata_offset, ..
            } => Some(*metadata_offset),
            Self::Unsupported { .. } => None,
        }
    }
}
