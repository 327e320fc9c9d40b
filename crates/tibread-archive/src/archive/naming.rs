//! Dialect B volume file names
//!
//! `<name>_<strategy>_b<backup>_s<slice>_v<volume>.tib`, for example
//! `Docs_full_b1_s2_v1.tib`.

use regex::Regex;

const VOLUME_FILE_PATTERN: &str = r"^(.*)_(full|inc|[a-z]+)_b([0-9]+)_s([0-9]+)_v([0-9]+)\.tib$";

/// Fields encoded in a volume file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeName {
    /// Archive name
    pub name: String,
    /// Backup strategy, usually `full` or `inc`
    pub strategy: String,
    /// Backup number; archives sharing a name differ by this
    pub backup: u32,
    /// Slice number, from 1
    pub slice: u32,
    /// Volume number within the slice, from 1
    pub volume: u32,
}

/// Compiled volume file name matcher
#[derive(Debug, Clone)]
pub struct VolumeNamer {
    pattern: Regex,
}

impl VolumeNamer {
    /// Compile the matcher
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(VOLUME_FILE_PATTERN)?,
        })
    }

    /// Parse a bare file name; `None` if it does not follow the scheme
    pub fn parse(&self, file_name: &str) -> Option<VolumeName> {
        let caps = self.pattern.captures(file_name)?;
        Some(VolumeName {
            name: caps[1].to_string(),
            strategy: caps[2].to_string(),
            backup: caps[3].parse().ok()?,
            slice: caps[4].parse().ok()?,
            volume: caps[5].parse().ok()?,
        })
    }
}
