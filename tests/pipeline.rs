//! End-to-end ingest runs against in-memory backends.

use ironsilo::document::{Document, DocumentBuilder};
use ironsilo::error::{PipelineError, TransformError};
use ironsilo::loader::LoaderConfig;
use ironsilo::source::delimited::{RowGroup, RowGroups};
use ironsilo::testing::RecordingBackend;
use ironsilo::xref::CrossReferenceIndex;
use ironsilo::{TargetSpec, run_pooled, run_sequential};
use serde_json::{Value, json};
use std::io::Cursor;

const ROWS: &str = "C001\twidth\t12\n\
                    C001\theight\t7\n\
                    C002\twidth\t30\n\
                    C003\twidth\t5\n\
                    C003\theight\t9\n\
                    C003\tdepth\t2\n";

fn groups(rows: &'static str) -> RowGroups<Cursor<&'static [u8]>> {
    RowGroups::new(Cursor::new(rows.as_bytes()))
}

fn group_transformer()
-> impl Fn(RowGroup, Option<&CrossReferenceIndex>) -> Result<Document, TransformError> + Send + Sync
{
    |group: RowGroup, _xrefs: Option<&CrossReferenceIndex>| {
        let properties: Vec<Value> = group
            .rows
            .iter()
            .map(|row| json!({"name": row[1], "value": row[2]}))
            .collect();
        Ok(DocumentBuilder::new(group.key.as_str())
            .field("properties", properties)
            .build())
    }
}

#[test]
fn sequential_run_loads_every_group() -> anyhow::Result<()> {
    let mut backend = RecordingBackend::new();
    let report = run_sequential(
        groups(ROWS),
        &group_transformer(),
        None,
        &mut backend,
        &TargetSpec::new("catalog"),
        LoaderConfig::new(),
    )?;

    assert_eq!(report.records, 3);
    assert_eq!(report.written, 3);
    assert_eq!(report.failed, 0);
    assert!(backend.finalized());

    let written: Vec<&str> = backend.written().iter().map(|id| id.as_str()).collect();
    assert_eq!(written, vec!["C001", "C002", "C003"]);
    Ok(())
}

#[test]
fn pooled_run_matches_the_sequential_totals() -> anyhow::Result<()> {
    let mut sequential = RecordingBackend::new();
    let sequential_report = run_sequential(
        groups(ROWS),
        &group_transformer(),
        None,
        &mut sequential,
        &TargetSpec::new("catalog"),
        LoaderConfig::new(),
    )?;

    let mut pooled = RecordingBackend::new();
    let pooled_report = run_pooled(
        groups(ROWS),
        &group_transformer(),
        None,
        &mut pooled,
        &TargetSpec::new("catalog"),
        LoaderConfig::new().with_workers(2),
    )?;

    assert_eq!(pooled_report.records, sequential_report.records);
    assert_eq!(pooled_report.written, sequential_report.written);
    assert_eq!(pooled_report.failed, 0);
    assert_eq!(pooled_report.oversize, 0);

    // Worker completion order is not deterministic; the loaded set is.
    let mut sequential_ids: Vec<&str> =
        sequential.written().iter().map(|id| id.as_str()).collect();
    let mut pooled_ids: Vec<&str> = pooled.written().iter().map(|id| id.as_str()).collect();
    sequential_ids.sort_unstable();
    pooled_ids.sort_unstable();
    assert_eq!(pooled_ids, sequential_ids);
    assert!(pooled.finalized());
    Ok(())
}

#[test]
fn transform_failures_skip_the_record_and_continue() -> anyhow::Result<()> {
    let transformer = |group: RowGroup,
                       _xrefs: Option<&CrossReferenceIndex>|
     -> Result<Document, TransformError> {
        if group.key == "C002" {
            return Err(TransformError::invalid(group.key.clone(), "unusable group"));
        }
        Ok(DocumentBuilder::new(group.key.as_str()).build())
    };

    let mut backend = RecordingBackend::new();
    let report = run_sequential(
        groups(ROWS),
        &transformer,
        None,
        &mut backend,
        &TargetSpec::new("catalog"),
        LoaderConfig::new(),
    )?;

    assert_eq!(report.records, 3);
    assert_eq!(report.written, 2);
    assert_eq!(report.transform_failures, 1);
    let written: Vec<&str> = backend.written().iter().map(|id| id.as_str()).collect();
    assert_eq!(written, vec!["C001", "C003"]);
    Ok(())
}

#[test]
fn backend_failure_ends_the_run() {
    let mut backend = RecordingBackend::new().with_chunk_error_at(1);
    let err = run_sequential(
        groups(ROWS),
        &group_transformer(),
        None,
        &mut backend,
        &TargetSpec::new("catalog"),
        LoaderConfig::new().with_max_records(1),
    )
    .expect_err("the injected chunk failure must surface");
    assert!(matches!(err, PipelineError::Backend(_)), "{err}");
}

#[cfg(feature = "format-xml")]
mod markup_pipeline {
    use super::*;
    use ironsilo::backend::{DocumentStoreBackend, SearchIndexBackend};
    use ironsilo::source::markup::MarkupRecords;
    use ironsilo::testing::{catalog_transformer, sample_catalog_markup, sample_xref_rows};

    fn catalog_records(markup: &'static str) -> MarkupRecords<Cursor<&'static [u8]>> {
        MarkupRecords::new(Cursor::new(markup.as_bytes()), 2)
    }

    #[test]
    fn documents_carry_cross_references_in_file_order() -> anyhow::Result<()> {
        let xrefs = CrossReferenceIndex::from_reader(Cursor::new(sample_xref_rows()), "catalog")?;
        let mut backend = SearchIndexBackend::new();
        let report = run_sequential(
            catalog_records(sample_catalog_markup()),
            &catalog_transformer(),
            Some(&xrefs),
            &mut backend,
            &TargetSpec::new("catalog"),
            LoaderConfig::new(),
        )?;

        assert_eq!(report.records, 3);
        assert_eq!(report.written, 3);
        assert_eq!(backend.searchable(), 3);

        let c001 = backend.get("C001").expect("C001 is searchable");
        assert_eq!(
            c001.field("xrefs"),
            Some(&json!([
                {"namespace": "pdb", "identifier": "1ABC", "metadata": ["structure", "xray"]},
                {"namespace": "kegg", "identifier": "K00001"},
            ]))
        );
        assert_eq!(c001.field("revision"), Some(&json!(3)));
        assert_eq!(c001.field("tags"), Some(&json!(["soluble", "reviewed"])));

        let c002 = backend.get("C002").expect("C002 is searchable");
        assert_eq!(
            c002.field("xrefs"),
            Some(&json!([
                {"namespace": "catalog", "identifier": "LEGACY-7", "metadata": ["imported"]},
            ]))
        );

        let c003 = backend.get("C003").expect("C003 is searchable");
        assert_eq!(c003.field("xrefs"), Some(&json!([])));
        assert_eq!(c003.field("tags"), Some(&json!([])));
        Ok(())
    }

    const TRUNCATED: &str = "<catalog>\
        <entry><accession>C001</accession></entry>\
        <entry><accession>C002</accession></entry>\
        <entry><accession>C003</accession>";

    #[test]
    fn parse_failure_keeps_what_already_loaded() {
        let mut backend = DocumentStoreBackend::new().with_indexes(["name"]);
        let err = run_sequential(
            catalog_records(TRUNCATED),
            &catalog_transformer(),
            None,
            &mut backend,
            &TargetSpec::new("catalog"),
            LoaderConfig::new().with_max_records(1),
        )
        .expect_err("the truncated stream must fail");

        assert!(matches!(err, PipelineError::Parse(_)), "{err}");
        assert_eq!(backend.len(), 2, "formed chunks drain before the error");
        assert!(backend.get("C001").is_some());
        assert!(backend.get("C002").is_some());
        assert!(
            !backend.index_built("name"),
            "an aborted run must not finalize"
        );
    }

    #[test]
    fn pooled_run_drains_on_parse_failure_too() {
        let mut backend = DocumentStoreBackend::new();
        let err = run_pooled(
            catalog_records(TRUNCATED),
            &catalog_transformer(),
            None,
            &mut backend,
            &TargetSpec::new("catalog"),
            LoaderConfig::new().with_max_records(1).with_workers(2),
        )
        .expect_err("the truncated stream must fail");

        assert!(matches!(err, PipelineError::Parse(_)), "{err}");
        assert_eq!(backend.len(), 2, "formed chunks drain before the error");
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn a_compressed_file_loads_end_to_end() -> anyhow::Result<()> {
        use ironsilo::source::markup::open_markup;
        use ironsilo::testing::write_gzip_fixture;
        use tempfile::tempdir;

        let dir = tempdir()?;
        let path = write_gzip_fixture(
            dir.path(),
            "catalog.xml.gz",
            sample_catalog_markup().as_bytes(),
        )?;

        let mut backend = SearchIndexBackend::new();
        let report = run_sequential(
            open_markup(&path, 2)?,
            &catalog_transformer(),
            None,
            &mut backend,
            &TargetSpec::new("catalog"),
            LoaderConfig::new(),
        )?;

        assert_eq!(report.written, 3);
        assert_eq!(backend.searchable(), 3);
        assert_eq!(
            backend.get("C001").and_then(|d| d.field("name")),
            Some(&json!("alpha"))
        );
        Ok(())
    }
}
