//! Merging a run's annotations into the persisted table, and deciding
//! whether a run may re-annotate at all.

use crate::annotate::table::{AnnotationTable, ColumnCollision};
use crate::annotate::{FASTA_COL, GENE_ID_COL};
use crate::core::project::RunMetadata;
use crate::{AnnotError, Result};
use std::collections::BTreeSet;

/// Columns every run produces; colliding on them is expected
pub const STRUCTURAL_COLUMNS: [&str; 2] = [FASTA_COL, GENE_ID_COL];

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Non-structural columns whose values came from the new run
    pub overwritten_columns: Vec<String>,
    /// Rows present in both tables
    pub colliding_rows: usize,
    /// Past rows carried over untouched
    pub carried_rows: usize,
    /// The joined row count disagreed with the inputs; inspect the result
    pub row_count_mismatch: bool,
}

/// Merge `new` onto `past`.
///
/// For rows in both tables, the colliding columns take `new`'s values and all
/// other past columns survive. Past rows `new` does not mention are appended
/// unchanged. Colliding non-structural columns need `force`.
pub fn merge_past_annotations(
    new: AnnotationTable,
    past: AnnotationTable,
    force: bool,
) -> Result<(AnnotationTable, MergeReport)> {
    let colliding_columns = past.shared_columns(&new);
    let problems: Vec<String> = colliding_columns
        .iter()
        .filter(|c| !STRUCTURAL_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect();
    if !problems.is_empty() {
        if !force {
            return Err(AnnotError::Usage(format!(
                "columns ({}) already exist in the past annotations; use the force flag to overwrite them",
                problems.join(", ")
            )));
        }
        tracing::warn!(
            "Columns ({}) already exist in the past annotations and will be overwritten",
            problems.join(", ")
        );
    }

    let colliding_rows = past.shared_rows(&new);
    let (mut past_merge, past_rest) = past.partition_rows(&colliding_rows);
    past_merge.drop_columns(&colliding_columns);

    let past_merge_len = past_merge.len();
    let new_len = new.len();
    let joined = new.join(past_merge, ColumnCollision::Refuse)?;
    let row_count_mismatch = joined.len() != past_merge_len.max(new_len);
    if row_count_mismatch {
        tracing::error!(
            "The old and new annotations may not have merged correctly ({} rows after joining {} new and {} past); \
             check the annotations table and that the same gene FASTAs were used",
            joined.len(),
            new_len,
            past_merge_len
        );
    }

    let report = MergeReport {
        overwritten_columns: problems,
        colliding_rows: colliding_rows.len(),
        carried_rows: past_rest.len(),
        row_count_mismatch,
    };
    Ok((joined.concat(past_rest)?, report))
}

/// Refuse to re-run databases the project was already annotated with, unless forced.
///
/// `baseline` is the latest recorded run; without one nothing can collide.
pub fn check_reannotation<S: AsRef<str>>(
    baseline: Option<&RunMetadata>,
    requested: &[S],
    batch_names: &[S],
    force: bool,
) -> Result<()> {
    let Some(baseline) = baseline else {
        return Ok(());
    };
    let db_overlap: BTreeSet<&str> = requested
        .iter()
        .map(AsRef::as_ref)
        .filter(|db| baseline.used_dbs.contains(*db))
        .collect();
    if db_overlap.is_empty() {
        return Ok(());
    }
    let batch_overlap = batch_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|b| baseline.batch_names.contains(*b))
        .count();
    let dbs = db_overlap.into_iter().collect::<Vec<_>>().join(", ");

    if force {
        tracing::warn!(
            "Re-annotating {} of {} gene batches with databases they were already annotated with: {}. \
             Past annotations from these databases will be replaced",
            batch_overlap,
            batch_names.len(),
            dbs
        );
        Ok(())
    } else {
        Err(AnnotError::Usage(format!(
            "{} of {} gene batches were already annotated with {}; use the force flag (-f) to replace \
             those annotations",
            batch_overlap,
            batch_names.len(),
            dbs
        )))
    }
}
