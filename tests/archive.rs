#![cfg(feature = "archive-zip")]

use ironsilo::error::ParseError;
use ironsilo::source::archive::{ArchiveEntries, EntryRecords, open_archive};
use ironsilo::source::delimited::{RowGroup, RowGroups};
use ironsilo::testing::write_zip_fixture;
use std::io::Read;
use tempfile::tempdir;

#[test]
fn entries_come_in_archive_order_without_directories() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_zip_fixture(
        dir.path(),
        "bundle.zip",
        &[
            ("a.txt", b"alpha".as_slice()),
            ("sub/", b"".as_slice()),
            ("sub/b.txt", b"beta".as_slice()),
        ],
    )?;

    let mut names = Vec::new();
    let mut contents = Vec::new();
    for entry in ArchiveEntries::open(&path)? {
        let entry = entry?;
        names.push(entry.name().to_string());
        let mut text = String::new();
        entry.into_reader()?.read_to_string(&mut text)?;
        contents.push(text);
    }
    assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
    assert_eq!(contents, vec!["alpha", "beta"]);
    Ok(())
}

#[test]
fn records_flatten_across_entries() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_zip_fixture(
        dir.path(),
        "bundle.zip",
        &[
            ("part1.tsv", b"A\t1\nA\t2\n".as_slice()),
            ("part2.tsv", b"B\t3\n".as_slice()),
        ],
    )?;

    let records = open_archive(&path, |name, reader| {
        name.ends_with(".tsv")
            .then(|| Box::new(RowGroups::new(reader)) as EntryRecords<RowGroup>)
    })?;
    let groups = records.collect::<Result<Vec<_>, _>>()?;
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "B"]);
    assert_eq!(groups[0].len(), 2);
    Ok(())
}

#[test]
fn unmatched_entries_are_skipped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_zip_fixture(
        dir.path(),
        "bundle.zip",
        &[
            ("README.md", b"notes".as_slice()),
            ("data.tsv", b"K\tv\n".as_slice()),
        ],
    )?;

    let records = open_archive(&path, |name, reader| {
        name.ends_with(".tsv")
            .then(|| Box::new(RowGroups::new(reader)) as EntryRecords<RowGroup>)
    })?;
    let groups = records.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "K");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn entries_decompress_individually() -> anyhow::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"Z\t9\nZ\t8\n")?;
    let compressed = encoder.finish()?;

    let dir = tempdir()?;
    let path = write_zip_fixture(
        dir.path(),
        "bundle.zip",
        &[
            ("part1.tsv", b"A\t1\n".as_slice()),
            ("part2.tsv.gz", compressed.as_slice()),
        ],
    )?;

    let mut seen_names = Vec::new();
    let records = open_archive(&path, |name, reader| {
        seen_names.push(name.to_string());
        name.ends_with(".tsv")
            .then(|| Box::new(RowGroups::new(reader)) as EntryRecords<RowGroup>)
    })?;
    let groups = records.collect::<Result<Vec<_>, _>>()?;
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "Z"]);
    // The codec extension is stripped before the name reaches the callback.
    assert_eq!(seen_names, vec!["part1.tsv", "part2.tsv"]);
    Ok(())
}

#[test]
fn member_failure_aborts_the_rest_of_the_archive() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_zip_fixture(
        dir.path(),
        "bundle.zip",
        &[
            ("bad.tsv", b"A\t1\nA\t2\textra\n".as_slice()),
            ("good.tsv", b"B\t3\n".as_slice()),
        ],
    )?;

    let mut records = open_archive(&path, |name, reader| {
        name.ends_with(".tsv")
            .then(|| Box::new(RowGroups::new(reader)) as EntryRecords<RowGroup>)
    })?;
    let err = records
        .next()
        .expect("an item")
        .expect_err("malformed member must fail");
    assert!(matches!(err, ParseError::Delimited { .. }), "{err}");
    assert!(records.next().is_none(), "later members must not be parsed");
    Ok(())
}

#[test]
fn empty_archive_yields_nothing() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_zip_fixture(dir.path(), "empty.zip", &[])?;

    let entries = ArchiveEntries::open(&path)?;
    assert!(entries.is_empty());

    let mut records = open_archive(&path, |_, reader| {
        Some(Box::new(RowGroups::new(reader)) as EntryRecords<RowGroup>)
    })?;
    assert!(records.next().is_none());
    Ok(())
}
