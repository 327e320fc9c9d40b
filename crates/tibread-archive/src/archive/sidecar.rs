//! Dialect A assembly: one volume plus its sidecar metadata file

use super::Assembled;
use crate::config::{ConfigDecoder, OpenOptions};
use crate::error::{ArchiveError, ArchiveResult};
use crate::slice::Slice;
use crate::volume::Volume;
use std::path::{Path, PathBuf};
use tibread_formats::sidecar::SidecarFile;
use tibread_formats::{Diagnostics, FileSource};
use tracing::debug;

/// Sidecar path for a volume path
pub(super) fn sidecar_path(volume: &Path, suffix: &str) -> PathBuf {
    let mut path = volume.as_os_str().to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

/// Archive name: the volume file name without `.tib`
fn archive_name(volume: &Path) -> String {
    let file_name = volume
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.strip_suffix(".tib") {
        Some(stem) => stem.to_string(),
        None => file_name,
    }
}

pub(super) fn assemble(
    seed: Volume,
    options: &OpenOptions,
    decoder: &dyn ConfigDecoder,
    diag: &mut Diagnostics,
) -> ArchiveResult<Assembled> {
    let meta_path = sidecar_path(seed.path(), &options.sidecar_suffix);
    if !meta_path.is_file() {
        return Err(ArchiveError::MissingSidecar(meta_path));
    }

    // The sidecar is only needed while its slices are decoded
    let meta = {
        let mut source = FileSource::open(&meta_path)?;
        SidecarFile::read(&mut source, diag)?
    };

    let slices = meta
        .metadata()
        .enumerate()
        .map(|(index, box_meta)| Slice::from_metadata(index, 0, box_meta, decoder))
        .collect::<ArchiveResult<Vec<_>>>()?;
    debug!(
        "Sidecar {} describes {} slices",
        meta_path.display(),
        slices.len()
    );

    Ok(Assembled {
        name: archive_name(seed.path()),
        volumes: vec![seed],
        slices,
        data: None,
    })
}
