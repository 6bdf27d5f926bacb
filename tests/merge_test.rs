use annokit::annotate::merge::{check_reannotation, merge_past_annotations};
use annokit::core::config::AnnotateSettings;
use annokit::core::project::RunMetadata;
use annokit::{AnnotError, AnnotationTable};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn table(rows: &[(&str, &[(&str, &str)])]) -> AnnotationTable {
    let mut t = AnnotationTable::new();
    for (row, cells) in rows {
        for (col, value) in *cells {
            t.set(row, col, *value);
        }
    }
    t
}

/// Every filled cell, independent of row and column order
fn cells(t: &AnnotationTable) -> BTreeMap<(String, String), String> {
    let mut out = BTreeMap::new();
    for row in t.row_ids() {
        for (col, value) in t.row(row).unwrap_or_default() {
            if let Some(value) = value {
                out.insert((row.to_string(), col.to_string()), value.to_string());
            }
        }
    }
    out
}

fn past() -> AnnotationTable {
    table(&[
        ("A_1", &[("fasta", "A"), ("gene_ids", "1"), ("peptidase_hit", "MER_OLD"), ("kofam_id", "K00001")]),
        ("A_2", &[("fasta", "A"), ("gene_ids", "2"), ("peptidase_hit", "MER_KEEP"), ("kofam_id", "K00002")]),
    ])
}

fn new() -> AnnotationTable {
    table(&[
        ("A_1", &[("fasta", "A"), ("gene_ids", "1"), ("peptidase_hit", "MER_NEW")]),
        ("A_3", &[("fasta", "A"), ("gene_ids", "3"), ("peptidase_hit", "MER_THREE")]),
    ])
}

fn baseline(dbs: &[&str], batches: &[&str]) -> RunMetadata {
    RunMetadata {
        run_id: "annotations_20240101000000".to_string(),
        version: "0.1.0".to_string(),
        created_at: chrono::Utc::now(),
        annotations_tsv: PathBuf::from("annotations.tsv"),
        working_dir: PathBuf::from("annotations_20240101000000"),
        used_dbs: dbs.iter().map(|s| s.to_string()).collect(),
        batch_names: batches.iter().map(|s| s.to_string()).collect(),
        settings: AnnotateSettings::default(),
        kit_settings: BTreeMap::new(),
    }
}

#[test]
fn test_colliding_rows_take_new_values_and_keep_other_columns() {
    let (merged, report) = merge_past_annotations(new(), past(), true).unwrap();

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get("A_1", "peptidase_hit"), Some("MER_NEW"));
    assert_eq!(merged.get("A_1", "kofam_id"), Some("K00001"));
    assert_eq!(merged.get("A_2", "peptidase_hit"), Some("MER_KEEP"));
    assert_eq!(merged.get("A_2", "kofam_id"), Some("K00002"));
    assert_eq!(merged.get("A_3", "peptidase_hit"), Some("MER_THREE"));
    assert_eq!(merged.get("A_3", "kofam_id"), None);
    assert_eq!(report.overwritten_columns, vec!["peptidase_hit"]);
    assert_eq!(report.colliding_rows, 1);
    assert_eq!(report.carried_rows, 1);
    assert!(!report.row_count_mismatch);
}

#[test]
fn test_colliding_columns_need_force() {
    let err = merge_past_annotations(new(), past(), false).unwrap_err();
    assert!(matches!(err, AnnotError::Usage(_)));
    assert!(err.to_string().contains("peptidase_hit"));
}

#[test]
fn test_structural_columns_never_need_force() {
    let past = table(&[("A_1", &[("fasta", "A"), ("gene_ids", "1"), ("kofam_id", "K1")])]);
    let new = table(&[("B_1", &[("fasta", "B"), ("gene_ids", "1"), ("heme_regulatory_motif_count", "2")])]);

    let (merged, report) = merge_past_annotations(new, past, false).unwrap();
    assert_eq!(merged.len(), 2);
    assert!(report.overwritten_columns.is_empty());
    assert_eq!(merged.get("A_1", "fasta"), Some("A"));
    assert_eq!(merged.get("B_1", "heme_regulatory_motif_count"), Some("2"));
}

#[test]
fn test_forced_merge_is_idempotent() {
    let (once, _) = merge_past_annotations(new(), past(), true).unwrap();
    let (twice, report) = merge_past_annotations(new(), once.clone(), true).unwrap();

    assert_eq!(cells(&twice), cells(&once));
    assert_eq!(report.colliding_rows, 2);
}

#[test]
fn test_reannotation_with_used_database() {
    let run = baseline(&["peptidase", "kofam"], &["A"]);
    let requested = vec!["peptidase".to_string(), "heme".to_string()];
    let batches = vec!["A".to_string(), "B".to_string()];

    let err = check_reannotation(Some(&run), &requested, &batches, false).unwrap_err();
    assert!(matches!(err, AnnotError::Usage(_)));
    assert!(err.to_string().contains("peptidase"));
    assert!(err.to_string().contains("1 of 2"));

    check_reannotation(Some(&run), &requested, &batches, true).unwrap();
}

#[test]
fn test_new_databases_need_no_force() {
    let run = baseline(&["peptidase"], &["A"]);
    let requested = vec!["heme".to_string()];
    let batches = vec!["A".to_string()];
    check_reannotation(Some(&run), &requested, &batches, false).unwrap();
    check_reannotation(None, &requested, &batches, false).unwrap();
}

#[test]
fn test_merging_a_table_onto_itself_changes_nothing() {
    let t = past();
    let (merged, report) = merge_past_annotations(t.clone(), t.clone(), true).unwrap();

    assert_eq!(merged, t);
    assert_eq!(merged.num_columns(), t.num_columns());
    assert_eq!(cells(&merged), cells(&t));
    assert_eq!(report.overwritten_columns, vec!["peptidase_hit", "kofam_id"]);
    assert_eq!(report.colliding_rows, 2);
    assert_eq!(report.carried_rows, 0);
    assert!(!report.row_count_mismatch);

    assert!(matches!(
        merge_past_annotations(t.clone(), t, false),
        Err(AnnotError::Usage(_))
    ));
}

#[test]
fn test_structural_table_merges_onto_itself_without_force() {
    let t = table(&[
        ("A_1", &[("fasta", "A"), ("gene_ids", "1")]),
        ("B_1", &[("fasta", "B"), ("gene_ids", "1")]),
    ]);
    let (merged, report) = merge_past_annotations(t.clone(), t.clone(), false).unwrap();

    assert_eq!(merged, t);
    assert!(report.overwritten_columns.is_empty());
    assert_eq!(report.colliding_rows, 2);
    assert!(!report.row_count_mismatch);
}
