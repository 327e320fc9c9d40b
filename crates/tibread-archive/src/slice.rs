//! Slices: one backup generation each

use crate::config::{ConfigDecoder, ConfigText};
use crate::error::{ArchiveError, ArchiveResult};
use crate::tree::FileTree;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tibread_formats::Timestamp;
use tibread_formats::sequenced::{ConfigAttribute, ListingEntry, SliceForm};
use tibread_formats::sidecar::MetaDataBox;

/// Product that wrote a slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Product name
    pub name: String,
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Build number
    pub build: u32,
}

/// Raw configuration text as stored in the slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Attribute key, for dialect B
    pub key: Option<String>,
    /// XML text
    pub text: String,
}

/// Configuration of one slice
///
/// Fields are filled in by a [`ConfigDecoder`]. A slice may carry several
/// configuration texts; a field set by more than one must agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Machine (computer) id
    pub machine_id: Option<String>,
    /// Paths included in the backup
    pub include_paths: Option<Vec<String>>,
    /// Paths excluded from the backup
    pub exclude_paths: Option<Vec<String>>,
    /// Writing product
    pub product_info: Option<ProductInfo>,
    /// Backup task id
    pub task_id: Option<String>,
    /// Compression descriptor
    pub compression: Option<String>,
    /// Encryption descriptor
    pub encryption: Option<String>,
    /// Every configuration text seen, in order
    pub raw: Vec<RawConfig>,
}

fn merge<T: PartialEq + Debug>(slot: &mut Option<T>, value: T, field: &'static str) -> ArchiveResult<()> {
    match slot {
        Some(existing) if *existing != value => Err(ArchiveError::ConfigConflict {
            field,
            existing: format!("{existing:?}"),
            new: format!("{value:?}"),
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

impl SliceConfig {
    /// Record the machine id
    pub fn set_machine_id(&mut self, id: impl Into<String>) -> ArchiveResult<()> {
        merge(&mut self.machine_id, id.into(), "machine_id")
    }

    /// Record the include paths
    pub fn set_include_paths(&mut self, paths: Vec<String>) -> ArchiveResult<()> {
        merge(&mut self.include_paths, paths, "include_paths")
    }

    /// Record the exclude paths
    pub fn set_exclude_paths(&mut self, paths: Vec<String>) -> ArchiveResult<()> {
        merge(&mut self.exclude_paths, paths, "exclude_paths")
    }

    /// Record the product info
    pub fn set_product_info(&mut self, info: ProductInfo) -> ArchiveResult<()> {
        merge(&mut self.product_info, info, "product_info")
    }

    /// Record the task id
    pub fn set_task_id(&mut self, id: impl Into<String>) -> ArchiveResult<()> {
        merge(&mut self.task_id, id.into(), "task_id")
    }

    /// Record the compression descriptor
    pub fn set_compression(&mut self, level: impl Into<String>) -> ArchiveResult<()> {
        merge(&mut self.compression, level.into(), "compression")
    }

    /// Record the encryption descriptor
    pub fn set_encryption(&mut self, level: impl Into<String>) -> ArchiveResult<()> {
        merge(&mut self.encryption, level.into(), "encryption")
    }

    /// Keep a raw text and hand it to the decoder
    pub(crate) fn absorb(
        &mut self,
        key: Option<&str>,
        text: &str,
        decoder: &dyn ConfigDecoder,
    ) -> ArchiveResult<()> {
        self.raw.push(RawConfig {
            key: key.map(str::to_string),
            text: text.to_string(),
        });
        decoder.decode(ConfigText { key, text }, self)
    }
}

/// One backup generation
#[derive(Debug, Clone)]
pub struct Slice {
    index: usize,
    id: Option<[u8; 16]>,
    created: Option<Timestamp>,
    parent: Option<usize>,
    volumes: Vec<usize>,
    config: SliceConfig,
    tree: FileTree,
    form: SliceForm,
}

impl Slice {
    /// Slice from a dialect A metadata box
    pub(crate) fn from_metadata(
        index: usize,
        volume: usize,
        meta: &MetaDataBox,
        decoder: &dyn ConfigDecoder,
    ) -> ArchiveResult<Self> {
        let mut config = SliceConfig::default();
        config.absorb(None, &meta.xml, decoder)?;

        Ok(Self {
            index,
            id: Some(meta.slice_id),
            created: Some(meta.created),
            parent: index.checked_sub(1),
            volumes: vec![volume],
            config,
            tree: FileTree::from_entries(&meta.files)?,
            form: SliceForm::FileLevel,
        })
    }

    /// Slice from dialect B trailer fields, config records and listing
    pub(crate) fn from_records(
        index: usize,
        volumes: Vec<usize>,
        id: [u8; 16],
        created: Timestamp,
        attributes: &[ConfigAttribute],
        listing: &[ListingEntry],
        decoder: &dyn ConfigDecoder,
    ) -> ArchiveResult<Self> {
        let mut config = SliceConfig::default();
        for attribute in attributes {
            config.absorb(Some(&attribute.key), &attribute.value, decoder)?;
        }

        Ok(Self {
            index,
            id: Some(id),
            created: Some(created),
            parent: index.checked_sub(1),
            volumes,
            config,
            tree: FileTree::from_listing(listing),
            form: SliceForm::FileLevel,
        })
    }

    /// Placeholder for a dialect B slice whose form cannot be decoded
    pub(crate) fn unsupported(index: usize, volumes: Vec<usize>, form: SliceForm) -> Self {
        Self {
            index,
            id: None,
            created: None,
            parent: index.checked_sub(1),
            volumes,
            config: SliceConfig::default(),
            tree: FileTree::default(),
            form,
        }
    }

    /// Position in the archive's slice list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Slice UUID; `None` for undecodable slices
    pub fn id(&self) -> Option<&[u8; 16]> {
        self.id.as_ref()
    }

    /// Slice UUID as lowercase hex
    pub fn id_hex(&self) -> Option<String> {
        self.id.map(hex::encode)
    }

    /// Creation time; `None` for undecodable slices
    pub fn created(&self) -> Option<Timestamp> {
        self.created
    }

    /// Index of the slice this one is incremental to; `None` for a base slice
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Indices of the volumes holding this slice's data
    pub fn volumes(&self) -> &[usize] {
        &self.volumes
    }

    /// Slice configuration
    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    /// File tree
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Backup form from the trailer
    pub fn form(&self) -> SliceForm {
        self.form
    }

    /// Whether the slice's metadata was decoded
    pub fn is_valid(&self) -> bool {
        self.form == SliceForm::FileLevel
    }
}
