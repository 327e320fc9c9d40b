//! Open options and the configuration decoding seam

use crate::error::ArchiveResult;
use crate::slice::SliceConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default suffix of a sidecar metadata file
pub const DEFAULT_SIDECAR_SUFFIX: &str = ".metadata";

/// Options controlling how an archive is opened and read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Treat a volume header checksum mismatch as fatal
    pub strict_checksums: bool,

    /// Check dialect B data blocks against their stored MD5
    pub verify_block_hashes: bool,

    /// Suffix appended to a dialect A volume path to find its metadata
    pub sidecar_suffix: String,

    /// Keep the last decompressed chunk of each dialect A volume
    pub chunk_cache: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            strict_checksums: false,
            verify_block_hashes: true,
            sidecar_suffix: DEFAULT_SIDECAR_SUFFIX.to_string(),
            chunk_cache: true,
        }
    }
}

impl OpenOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable strict header checksums
    #[must_use]
    pub const fn with_strict_checksums(mut self, strict: bool) -> Self {
        self.strict_checksums = strict;
        self
    }

    /// Enable or disable block hash verification
    #[must_use]
    pub const fn with_block_hash_verification(mut self, verify: bool) -> Self {
        self.verify_block_hashes = verify;
        self
    }

    /// Set the sidecar suffix
    #[must_use]
    pub fn with_sidecar_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.sidecar_suffix = suffix.into();
        self
    }

    /// Enable or disable the chunk cache
    #[must_use]
    pub const fn with_chunk_cache(mut self, enable: bool) -> Self {
        self.chunk_cache = enable;
        self
    }
}

/// One piece of raw configuration text handed to a [`ConfigDecoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigText<'a> {
    /// Attribute key for dialect B config records; `None` for dialect A
    pub key: Option<&'a str>,
    /// XML text
    pub text: &'a str,
}

/// Decodes configuration XML into slice configuration fields
///
/// Implementations merge values through the `set_*` helpers of
/// [`SliceConfig`], which reject a value that disagrees with one already
/// recorded for the same slice.
pub trait ConfigDecoder: Send + Sync + fmt::Debug {
    /// Decode one text and merge it into `config`
    fn decode(&self, input: ConfigText<'_>, config: &mut SliceConfig) -> ArchiveResult<()>;
}

/// Decoder that keeps only the raw text
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConfigDecoder;

impl ConfigDecoder for RawConfigDecoder {
    fn decode(&self, _input: ConfigText<'_>, _config: &mut SliceConfig) -> ArchiveResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = OpenOptions::default();
        assert!(!options.strict_checksums);
        assert!(options.verify_block_hashes);
        assert!(options.chunk_cache);
        assert_eq!(options.sidecar_suffix, ".metadata");
    }

    #[test]
    fn test_builders_and_partial_json() {
        let options = OpenOptions::new()
            .with_strict_checksums(true)
            .with_chunk_cache(false)
            .with_sidecar_suffix(".meta");
        assert!(options.strict_checksums);
        assert!(!options.chunk_cache);

        let parsed: OpenOptions =
            serde_json::from_str(r#"{"verify_block_hashes": false}"#).unwrap();
        assert_eq!(
            parsed,
            OpenOptions::default().with_block_hash_verification(false)
        );
    }
}
