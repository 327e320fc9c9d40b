//! Dialect B assembly: sibling volumes discovered by file name
//!
//! Volumes sharing the seed's archive name and backup number are opened,
//! ordered by header sequence and grouped into slices by the slice and
//! volume numbers in their names. Each slice's data windows are appended to
//! one composite source, so archive-relative offsets resolve against the
//! slices read so far.

use super::naming::{VolumeName, VolumeNamer};
use super::Assembled;
use crate::config::{ConfigDecoder, OpenOptions};
use crate::error::{ArchiveError, ArchiveResult};
use crate::slice::Slice;
use crate::volume::{SequencedVolume, Volume};
use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use tibread_formats::header::Dialect;
use tibread_formats::sequenced::{
    ConfigAttribute, ListingEntry, Record, RecordBody, SequencedError, SliceTrailer,
};
use tibread_formats::{ByteSource, ConcatSource, Diagnostics};
use tracing::{debug, info};

fn as_sequenced(volume: &Volume) -> ArchiveResult<&SequencedVolume> {
    volume
        .as_sequenced()
        .ok_or_else(|| ArchiveError::DialectMismatch {
            path: volume.path().to_path_buf(),
            expected: Dialect::Sequenced,
            found: volume.dialect(),
        })
}

/// Open every sibling of the seed that belongs to the same archive
fn discover(
    seed: Volume,
    seed_name: &VolumeName,
    namer: &VolumeNamer,
    options: &OpenOptions,
    diag: &mut Diagnostics,
) -> ArchiveResult<Vec<(VolumeName, Volume)>> {
    let seed_path = seed.path().to_path_buf();
    let seed_file = seed_path.file_name().map(|name| name.to_os_string());
    let dir = match seed_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let listing = |source| ArchiveError::Directory {
        path: dir.clone(),
        source,
    };
    let mut siblings = Vec::new();
    for entry in fs::read_dir(&dir).map_err(listing)? {
        let file_name = entry.map_err(listing)?.file_name();
        if Some(&file_name) == seed_file.as_ref() {
            continue;
        }
        let Some(parsed) = file_name.to_str().and_then(|name| namer.parse(name)) else {
            continue;
        };
        if parsed.name == seed_name.name && parsed.backup == seed_name.backup {
            siblings.push((parsed, dir.join(&file_name)));
        }
    }
    // Sorted only for deterministic logging; order comes from the headers
    siblings.sort_by(|a, b| a.1.cmp(&b.1));

    let mut parts = vec![(seed_name.clone(), seed)];
    for (parsed, path) in siblings {
        let volume = Volume::open(&path, options, diag)?;
        as_sequenced(&volume)?;
        parts.push((parsed, volume));
    }
    Ok(parts)
}

/// Header sequences must run 1..N and every archive key must match the seed's
fn check_chain(parts: &[(VolumeName, Volume)], archive_key: [u8; 4]) -> ArchiveResult<()> {
    for (position, (_, volume)) in parts.iter().enumerate() {
        let header = volume.header();
        let expected = position as u32 + 1;
        if header.sequence != expected {
            return Err(ArchiveError::InvalidSequenceChain {
                expected,
                found: header.sequence,
            });
        }
        if header.archive_key != archive_key {
            return Err(ArchiveError::ArchiveKeyMismatch {
                path: volume.path().to_path_buf(),
                expected: hex::encode(archive_key),
                found: hex::encode(header.archive_key),
            });
        }
    }
    Ok(())
}

/// Split sequence-ordered volumes into slices
///
/// Slice numbers run from 1 in order; inside a slice, volume numbers run
/// from 1 without gaps.
fn group_slices(names: &[VolumeName]) -> ArchiveResult<Vec<Range<usize>>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < names.len() {
        let slice = groups.len() as u32 + 1;
        let mut end = start;
        while let Some(name) = names.get(end).filter(|name| name.slice == slice) {
            let expected = (end - start) as u32 + 1;
            if name.volume != expected {
                return Err(ArchiveError::VolumeNumberGap {
                    slice,
                    expected,
                    found: name.volume,
                });
            }
            end += 1;
        }
        if end == start {
            return Err(ArchiveError::SliceNumberGap {
                expected: slice,
                found: names[start].slice,
            });
        }
        groups.push(start..end);
        start = end;
    }
    Ok(groups)
}

/// Config attributes and the listing that closes a slice's metadata
fn read_slice_metadata(
    source: &mut dyn ByteSource,
    metadata_offset: u64,
) -> ArchiveResult<(Vec<ConfigAttribute>, Vec<ListingEntry>)> {
    let len = source.length()?;
    source.seek(metadata_offset);

    let mut attributes = Vec::new();
    while source.pos() < len {
        let record = Record::read(source)?;
        match record.body {
            RecordBody::Config(found) => attributes.extend(found),
            RecordBody::Listing(entries) => return Ok((attributes, entries)),
            RecordBody::EndTrailer => {
                return Err(SequencedError::MissingListing {
                    offset: record.start,
                }
                .into());
            }
            _ => {}
        }
    }
    Err(SequencedError::MissingListing {
        offset: metadata_offset,
    }
    .into())
}

fn read_slice(
    index: usize,
    range: Range<usize>,
    volumes: &[Volume],
    data: &mut ConcatSource,
    decoder: &dyn ConfigDecoder,
    diag: &mut Diagnostics,
) -> ArchiveResult<Slice> {
    let last = range.end - 1;
    let mut actual = 0u64;
    for position in range.clone() {
        let window = as_sequenced(&volumes[position])?.slice_window(position == last)?;
        actual += window.length()?;
        data.append(Box::new(window))?;
    }

    let footer = as_sequenced(&volumes[last])?.read_footer()?;
    if footer.slice_length != actual {
        return Err(ArchiveError::SliceLength {
            slice: index,
            declared: footer.slice_length,
            actual,
        });
    }

    let mut view = data.slice(None, None)?;
    view.seek(footer.trailer_offset);
    let volume_ids: Vec<usize> = range.collect();

    match SliceTrailer::read(view.as_mut(), diag)? {
        SliceTrailer::Unsupported { form } => {
            info!("Slice {} has unsupported form {:?}", index, form);
            Ok(Slice::unsupported(index, volume_ids, form))
        }
        SliceTrailer::FileLevel {
            slice_id,
            created,
            metadata_offset,
        } => {
            let (attributes, listing) = read_slice_metadata(view.as_mut(), metadata_offset)?;
            debug!(
                "Slice {}: {} volumes, {} config attributes, {} listed entries",
                index,
                volume_ids.len(),
                attributes.len(),
                listing.len()
            );
            Slice::from_records(
                index,
                volume_ids,
                slice_id,
                created,
                &attributes,
                &listing,
                decoder,
            )
        }
    }
}

pub(super) fn assemble(
    seed: Volume,
    options: &OpenOptions,
    decoder: &dyn ConfigDecoder,
    diag: &mut Diagnostics,
) -> ArchiveResult<Assembled> {
    let namer = VolumeNamer::new()?;
    let seed_name = seed
        .path()
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| namer.parse(name))
        .ok_or_else(|| ArchiveError::InvalidFileName(seed.path().display().to_string()))?;
    let archive_key = seed.header().archive_key;

    let mut parts = discover(seed, &seed_name, &namer, options, diag)?;
    parts.sort_by_key(|(_, volume)| volume.header().sequence);
    check_chain(&parts, archive_key)?;

    let (names, volumes): (Vec<VolumeName>, Vec<Volume>) = parts.into_iter().unzip();
    let groups = group_slices(&names)?;
    info!(
        "Archive {:?}: {} volumes in {} slices",
        seed_name.name,
        volumes.len(),
        groups.len()
    );

    let mut data = ConcatSource::new(std::iter::empty())?;
    let mut slices = Vec::with_capacity(groups.len());
    for (index, range) in groups.into_iter().enumerate() {
        slices.push(read_slice(index, range, &volumes, &mut data, decoder, diag)?);
    }

    Ok(Assembled {
        name: seed_name.name,
        volumes,
        slices,
        data: Some(data),
    })
}
