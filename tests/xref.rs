use ironsilo::error::ParseError;
use ironsilo::xref::CrossReferenceIndex;
use serde_json::json;
use std::io::Cursor;

#[test]
fn entries_preserve_file_order_per_key() -> anyhow::Result<()> {
    let rows = "A:1\tK\tother\nA:2\tK\tother2\n";
    let index = CrossReferenceIndex::from_reader(Cursor::new(rows), "dataset")?;

    let entries = index.lookup("K").expect("key K is indexed");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].namespace, "A");
    assert_eq!(entries[0].identifier, "1");
    assert_eq!(entries[0].metadata, vec!["other"]);
    assert_eq!(entries[1].identifier, "2");
    assert_eq!(entries[1].metadata, vec!["other2"]);

    assert_eq!(
        index.lookup_value("K"),
        json!([
            {"namespace": "A", "identifier": "1", "metadata": ["other"]},
            {"namespace": "A", "identifier": "2", "metadata": ["other2"]},
        ])
    );
    Ok(())
}

#[test]
fn keyless_rows_fall_back_to_the_dataset_namespace() -> anyhow::Result<()> {
    let index = CrossReferenceIndex::from_reader(Cursor::new("LEGACY-7\tC002\timported\n"), "catalog")?;

    let entries = index.lookup("C002").expect("key C002 is indexed");
    assert_eq!(entries[0].namespace, "catalog");
    assert_eq!(entries[0].identifier, "LEGACY-7");
    assert_eq!(entries[0].metadata, vec!["imported"]);
    Ok(())
}

#[test]
fn absent_keys_yield_none_and_an_empty_array() -> anyhow::Result<()> {
    let index = CrossReferenceIndex::from_reader(Cursor::new("A:1\tK\n"), "dataset")?;
    assert!(index.lookup("missing").is_none());
    assert_eq!(index.lookup_value("missing"), json!([]));
    Ok(())
}

#[test]
fn empty_metadata_is_omitted_from_rendered_entries() -> anyhow::Result<()> {
    let index = CrossReferenceIndex::from_reader(Cursor::new("kegg:K00001\tC001\n"), "dataset")?;
    assert_eq!(
        index.lookup_value("C001"),
        json!([{"namespace": "kegg", "identifier": "K00001"}])
    );
    Ok(())
}

#[test]
fn short_rows_are_fatal() {
    let err = CrossReferenceIndex::from_reader(Cursor::new("pdb:1ABC\n"), "dataset")
        .expect_err("a row without a foreign identifier must fail");
    assert!(matches!(err, ParseError::Delimited { row: 1, .. }), "{err}");

    let err = CrossReferenceIndex::from_reader(Cursor::new("A:1\tK\nplain\n"), "dataset")
        .expect_err("the short second row must fail");
    assert!(matches!(err, ParseError::Delimited { row: 2, .. }), "{err}");
}

#[test]
fn custom_delimiter_is_honored() -> anyhow::Result<()> {
    let index = CrossReferenceIndex::from_reader_with_delimiter(
        Cursor::new("pdb:1ABC,C001,structure"),
        "dataset",
        b',',
    )?;
    let entries = index.lookup("C001").expect("key C001 is indexed");
    assert_eq!(entries[0].metadata, vec!["structure"]);
    Ok(())
}

#[test]
fn row_and_key_counts() -> anyhow::Result<()> {
    let empty = CrossReferenceIndex::from_reader(Cursor::new(""), "dataset")?;
    assert!(empty.is_empty());
    assert_eq!(empty.distinct_keys(), 0);

    let rows = "A:1\tK\nA:2\tK\nB:9\tL\n";
    let index = CrossReferenceIndex::from_reader(Cursor::new(rows), "dataset")?;
    assert_eq!(index.len(), 3);
    assert_eq!(index.distinct_keys(), 2);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn from_path_decompresses_transparently() -> anyhow::Result<()> {
    use ironsilo::testing::{sample_xref_rows, write_gzip_fixture};
    use tempfile::tempdir;

    let dir = tempdir()?;
    let path = write_gzip_fixture(dir.path(), "xref.tsv.gz", sample_xref_rows().as_bytes())?;

    let index = CrossReferenceIndex::from_path(&path, "catalog")?;
    let c001 = index.lookup("C001").expect("key C001 is indexed");
    assert_eq!(c001.len(), 2);
    assert_eq!(c001[0].namespace, "pdb");
    assert_eq!(c001[1].namespace, "kegg");

    let c002 = index.lookup("C002").expect("key C002 is indexed");
    assert_eq!(c002[0].namespace, "catalog");
    Ok(())
}
