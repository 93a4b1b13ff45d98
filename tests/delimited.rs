use ironsilo::error::ParseError;
use ironsilo::source::delimited::{DelimitedOptions, open_delimited, open_delimited_with};
use ironsilo::testing::{sample_sequence_rows, write_fixture};
use tempfile::tempdir;

#[test]
fn test_groups_by_adjacent_key() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", sample_sequence_rows().as_bytes())?;

    let groups = open_delimited(&path)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].key, "C001");
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[1].key, "C002");
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[2].key, "C003");
    assert_eq!(groups[2].len(), 3);

    // Columns come back in input order, key column included.
    let widths: Vec<&str> = groups[2].column(2).collect();
    assert_eq!(widths, vec!["5", "9", "2"]);
    Ok(())
}

#[test]
fn test_key_change_closes_group() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"A\tfirst\nA\tsecond\nB\tthird\n")?;

    let groups = open_delimited(&path)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "A");
    assert_eq!(
        groups[0].rows,
        vec![
            vec!["A".to_string(), "first".to_string()],
            vec!["A".to_string(), "second".to_string()],
        ]
    );
    assert_eq!(groups[1].key, "B");
    assert_eq!(groups[1].rows, vec![vec!["B".to_string(), "third".to_string()]]);
    Ok(())
}

#[test]
fn test_non_adjacent_key_reappears_as_new_group() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"A\t1\nB\t2\nA\t3\n")?;

    // Grouping is by adjacency, not by global key equality.
    let groups = open_delimited(&path)?.collect::<Result<Vec<_>, _>>()?;
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "B", "A"]);
    Ok(())
}

#[test]
fn test_unequal_column_count_is_fatal() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"A\t1\nA\t2\textra\nB\t3\n")?;

    let mut groups = open_delimited(&path)?;
    // The group under assembly is discarded with the error.
    let first = groups.next().expect("an item");
    let err = first.expect_err("structural failure");
    assert!(matches!(err, ParseError::Delimited { row: 2, .. }), "{err}");
    assert!(groups.next().is_none(), "stream must end after the failure");
    Ok(())
}

#[test]
fn test_key_column_out_of_range_is_fatal() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"A\t1\n")?;

    let options = DelimitedOptions {
        key_column: 5,
        ..DelimitedOptions::default()
    };
    let mut groups = open_delimited_with(&path, options)?;
    let err = groups.next().expect("an item").expect_err("bad key column");
    assert!(matches!(err, ParseError::Delimited { .. }), "{err}");
    assert!(err.to_string().contains("out of range"), "{err}");
    Ok(())
}

#[test]
fn test_header_row_is_skipped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"key\tvalue\nA\t1\nA\t2\n")?;

    let options = DelimitedOptions {
        has_headers: true,
        ..DelimitedOptions::default()
    };
    let groups = open_delimited_with(&path, options)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "A");
    assert_eq!(groups[0].len(), 2);
    Ok(())
}

#[test]
fn test_custom_delimiter_and_key_column() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.csv", b"1,A\n2,A\n3,B\n")?;

    let options = DelimitedOptions {
        delimiter: b',',
        key_column: 1,
        ..DelimitedOptions::default()
    };
    let groups = open_delimited_with(&path, options)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "A");
    let ids: Vec<&str> = groups[0].column(0).collect();
    assert_eq!(ids, vec!["1", "2"]);
    Ok(())
}

#[test]
fn test_empty_input_yields_no_groups() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = write_fixture(dir.path(), "rows.tsv", b"")?;

    let mut groups = open_delimited(&path)?;
    assert!(groups.next().is_none());
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn test_compressed_input_is_transparent() -> anyhow::Result<()> {
    use ironsilo::testing::write_gzip_fixture;

    let dir = tempdir()?;
    let path = write_gzip_fixture(
        dir.path(),
        "rows.tsv.gz",
        sample_sequence_rows().as_bytes(),
    )?;

    let groups = open_delimited(&path)?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].key, "C001");
    Ok(())
}
