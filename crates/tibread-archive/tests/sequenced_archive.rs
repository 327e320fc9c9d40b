//! Dialect B archives: volumes discovered by file name and chained by
//! header sequence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{SequencedSlice, pattern, rewrite_header, write_sequenced_archive};
use pretty_assertions::assert_eq;
use std::fs;
use tibread_archive::{
    Archive, ArchiveError, ContentRef, Dialect, ErrorClass, NodeKind, OpenOptions, Warning,
};
use tibread_formats::sequenced::SliceForm;

fn base_slice() -> SequencedSlice {
    let mut slice = SequencedSlice::new(&[
        ("C:\\docs\\big.bin", &pattern(300, 9)[..]),
        ("C:\\docs\\small.txt", &b"tiny"[..]),
        ("C:\\zero.dat", &b""[..]),
    ]);
    slice.dirs = vec!["C:".to_string(), "C:\\docs".to_string()];
    slice.volumes = 2;
    slice
}

fn incremental_slice() -> SequencedSlice {
    let mut slice = SequencedSlice::new(&[("C:\\docs\\small.txt", &b"changed"[..])]);
    slice.config.push(("task".to_string(), "nightly".to_string()));
    slice
}

#[test]
fn test_three_files_make_two_linked_slices() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);
    assert_eq!(paths.len(), 3);

    // Any volume of the archive can seed the open
    for seed in &paths {
        let archive = Archive::open(seed, &OpenOptions::default()).unwrap();
        assert_eq!(archive.name(), "Docs");
        assert_eq!(archive.dialect(), Dialect::Sequenced);
        assert_eq!(archive.volumes().len(), 3);
        assert!(archive.warnings().is_empty());

        let sequences: Vec<u32> = archive
            .volumes()
            .iter()
            .map(|v| v.header().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        let slices = archive.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].volumes(), &[0, 1]);
        assert_eq!(slices[1].volumes(), &[2]);
        assert_eq!(slices[0].parent(), None);
        assert_eq!(slices[1].parent(), Some(0));
        assert_eq!(slices[1].id(), Some(&[2; 16]));
        assert!(slices.iter().all(|s| s.is_valid()));
    }
}

#[test]
fn test_config_attributes_are_kept_raw() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);
    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();

    let raw = &archive.slice(1).unwrap().config().raw;
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[1].key.as_deref(), Some("task"));
    assert_eq!(raw[1].text, "nightly");
}

#[test]
fn test_listing_tree_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);
    let archive = Archive::open(&paths[1], &OpenOptions::default()).unwrap();
    let tree = archive.slice(0).unwrap().tree();

    let docs = tree.resolve("/C:/docs").unwrap();
    assert_eq!(tree.node(docs).unwrap().kind, NodeKind::Directory);
    assert_eq!(tree.children(docs).count(), 2);

    let big = tree.resolve("/C:/docs/big.bin").unwrap();
    assert!(matches!(
        tree.node(big).unwrap().content,
        ContentRef::Records { .. }
    ));
    let expected = pattern(300, 9);
    // Blocks are 64 bytes; these reads straddle block edges
    assert_eq!(archive.read_to_end(0, big).unwrap(), expected);
    assert_eq!(archive.read_file(0, big, 60, 10).unwrap(), &expected[60..70]);
    assert_eq!(archive.read_file(0, big, 250, 1000).unwrap(), &expected[250..]);
    assert_eq!(archive.read_file(0, big, 128, 64).unwrap(), &expected[128..192]);

    let zero = tree.resolve("/C:/zero.dat").unwrap();
    assert!(archive.read_to_end(0, zero).unwrap().is_empty());

    // The later slice resolves offsets past the first slice's data
    let tree = archive.slice(1).unwrap().tree();
    let small = tree.resolve("/C:/docs/small.txt").unwrap();
    assert_eq!(archive.read_to_end(1, small).unwrap(), b"changed");
}

#[test]
fn test_sequence_gap_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);
    rewrite_header(&paths[1], Some(3), None);
    rewrite_header(&paths[2], Some(4), None);

    let err = Archive::open(&paths[0], &OpenOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::InvalidSequenceChain {
            expected: 2,
            found: 3
        }
    ));
    assert!(err.to_string().contains("invalid sequence chain"));
    assert_eq!(err.class(), ErrorClass::FormatViolation);
}

#[test]
fn test_archive_key_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);
    rewrite_header(&paths[2], None, Some([9, 9, 9, 9]));

    let err = Archive::open(&paths[0], &OpenOptions::default()).unwrap_err();
    match err {
        ArchiveError::ArchiveKeyMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, "10203040");
            assert_eq!(found, "09090909");
        }
        other => panic!("expected key mismatch, got {other:?}"),
    }
}

#[test]
fn test_other_archives_in_directory_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice()]);
    write_sequenced_archive(dir.path(), "Photos", &[incremental_slice()]);
    fs::write(dir.path().join("Docs_full_b2_s1_v1.tib"), b"other backup number").unwrap();
    fs::write(dir.path().join("readme.txt"), b"not a volume").unwrap();

    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();
    assert_eq!(archive.volumes().len(), 2);
    assert_eq!(archive.slices().len(), 1);
}

#[test]
fn test_missing_middle_volume() {
    let dir = tempfile::tempdir().unwrap();
    let mut slice = base_slice();
    slice.volumes = 3;
    let paths = write_sequenced_archive(dir.path(), "Docs", &[slice]);
    fs::remove_file(&paths[1]).unwrap();

    let err = Archive::open(&paths[0], &OpenOptions::default()).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidSequenceChain { .. }));
}

#[test]
fn test_bad_file_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[incremental_slice()]);
    let renamed = dir.path().join("renamed.tib");
    fs::rename(&paths[0], &renamed).unwrap();

    assert!(matches!(
        Archive::open(&renamed, &OpenOptions::default()),
        Err(ArchiveError::InvalidFileName(_))
    ));
}

#[test]
fn test_block_hash_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut slice = base_slice();
    slice.corrupt_hashes = true;
    let paths = write_sequenced_archive(dir.path(), "Docs", &[slice]);

    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();
    let big = archive.slice(0).unwrap().tree().resolve("/C:/docs/big.bin").unwrap();
    assert!(matches!(
        archive.read_to_end(0, big),
        Err(ArchiveError::BlockHash { .. })
    ));

    let lenient = OpenOptions::default().with_block_hash_verification(false);
    let archive = Archive::open(&paths[0], &lenient).unwrap();
    assert_eq!(archive.read_to_end(0, big).unwrap(), pattern(300, 9));
}

#[test]
fn test_oversized_listed_size_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut slice = base_slice();
    slice.listed_size = Some(0x0000_FFFF_FFFF_FFFF);
    let paths = write_sequenced_archive(dir.path(), "Docs", &[slice]);

    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();
    let tree = archive.slice(0).unwrap().tree();
    let big = tree.resolve("/C:/docs/big.bin").unwrap();
    assert_eq!(tree.node(big).unwrap().size, 0x0000_FFFF_FFFF_FFFF);

    assert!(matches!(
        archive.read_to_end(0, big),
        Err(ArchiveError::ShortBlob { .. })
    ));
    assert_eq!(archive.read_file(0, big, 0, 16).unwrap(), &pattern(300, 9)[..16]);
}

#[test]
fn test_sector_slice_is_marked_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let mut sector = incremental_slice();
    sector.form = 1;
    let paths = write_sequenced_archive(dir.path(), "Disk", &[base_slice(), sector]);

    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();
    let slice = archive.slice(1).unwrap();
    assert!(!slice.is_valid());
    assert_eq!(slice.form(), SliceForm::SectorBySector);
    assert!(slice.tree().is_empty());
    assert_eq!(archive.warnings(), &[Warning::UnsupportedSliceForm { form: 1 }]);
    assert!(matches!(
        archive.read_to_end(1, 0),
        Err(ArchiveError::UnsupportedSlice(1))
    ));
}

#[test]
fn test_truncated_slice_fails_length_check() {
    let dir = tempfile::tempdir().unwrap();
    let mut slice = base_slice();
    slice.volumes = 2;
    let paths = write_sequenced_archive(dir.path(), "Docs", &[slice]);

    // Drop bytes from the first volume; the footer still declares the full length
    let mut bytes = fs::read(&paths[0]).unwrap();
    bytes.truncate(bytes.len() - 5);
    fs::write(&paths[0], bytes).unwrap();

    assert!(matches!(
        Archive::open(&paths[1], &OpenOptions::default()),
        Err(ArchiveError::SliceLength { slice: 0, .. })
    ));
}

#[test]
fn test_footer_reads_without_scan() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[incremental_slice()]);
    let archive = Archive::open(&paths[0], &OpenOptions::default()).unwrap();

    let mut diag = tibread_archive::Diagnostics::new();
    match archive.volumes()[0].read_footer(&mut diag).unwrap() {
        tibread_archive::Footer::Slice(footer) => {
            let data_len = fs::metadata(&paths[0]).unwrap().len() - 0x20 - 16;
            assert_eq!(footer.slice_length, data_len);
            assert!(footer.trailer_offset < footer.slice_length);
        }
        other => panic!("expected a slice footer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_open_async() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_sequenced_archive(dir.path(), "Docs", &[base_slice(), incremental_slice()]);

    let archive = Archive::open_async(paths[2].clone(), OpenOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.slices().len(), 2);
    archive.close();

    let missing = Archive::open_async(dir.path().join("gone.tib"), OpenOptions::default()).await;
    assert!(matches!(missing, Err(ArchiveError::MissingVolume(_))));
}
