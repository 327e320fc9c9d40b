//! Dialect B volumes
//!
//! Record data starts right after the header. The last volume of a slice
//! ends with a footer.

use super::VolumeFile;
use crate::error::ArchiveResult;
use tibread_formats::{ByteSource, FileSource};
use tibread_formats::sequenced::{FOOTER_LEN, SequencedError, VolumeFooter};

/// One file of a dialect B archive
#[derive(Debug)]
pub struct SequencedVolume {
    pub(crate) file: VolumeFile,
}

impl SequencedVolume {
    pub(crate) fn new(file: VolumeFile) -> Self {
        Self { file }
    }

    /// View of everything after the header
    pub fn data(&self) -> ArchiveResult<FileSource> {
        Ok(self
            .file
            .source
            .sub_source(Some(self.file.data_start()), None)?)
    }

    /// View of the data a slice takes from this volume
    ///
    /// The last volume of a slice gives up its footer.
    pub fn slice_window(&self, last_in_slice: bool) -> ArchiveResult<FileSource> {
        let data = self.data()?;
        if !last_in_slice {
            return Ok(data);
        }
        let len = data.length()?;
        let end = len
            .checked_sub(FOOTER_LEN)
            .ok_or(SequencedError::FooterTooShort { len })?;
        Ok(data.sub_source(None, Some(end))?)
    }

    /// Decode the footer at the end of the volume
    pub fn read_footer(&self) -> ArchiveResult<VolumeFooter> {
        let mut data = self.data()?;
        Ok(VolumeFooter::read_from(&mut data)?)
    }
}
