//! Best-hit and reciprocal-best-hit search over a [`SequenceSearch`] tool.

use crate::annotate::table::AnnotationTable;
use crate::tools::traits::{AlignmentHit, SeqIndex, SequenceSearch};
use crate::Result;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A forward best hit and whether the target's own best hit points back at the query
#[derive(Debug, Clone, PartialEq)]
pub struct ReciprocalHit {
    pub query_id: String,
    pub target_id: String,
    pub is_reciprocal: bool,
    pub identity: f64,
    pub bit_score: f64,
    pub evalue: f64,
}

/// Keep the first row of each query, in the order the tool ranked them
pub fn top_hit_per_query(hits: Vec<AlignmentHit>) -> Vec<AlignmentHit> {
    let mut seen = std::collections::HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.query_id.clone()))
        .collect()
}

/// Tag each forward hit as reciprocal when the reverse search maps its target back to its query
pub fn classify_reciprocal(forward: &[AlignmentHit], reverse: &[AlignmentHit]) -> Vec<ReciprocalHit> {
    let mut reverse_best: HashMap<&str, &str> = HashMap::new();
    for hit in reverse {
        reverse_best
            .entry(hit.query_id.as_str())
            .or_insert(hit.target_id.as_str());
    }

    forward
        .iter()
        .map(|hit| ReciprocalHit {
            query_id: hit.query_id.clone(),
            target_id: hit.target_id.clone(),
            is_reciprocal: reverse_best.get(hit.target_id.as_str()) == Some(&hit.query_id.as_str()),
            identity: hit.identity,
            bit_score: hit.bit_score,
            evalue: hit.evalue,
        })
        .collect()
}

/// Render reciprocal hits as `<kit>_hit`, `<kit>_RBH`, `<kit>_identity`,
/// `<kit>_bitScore` and `<kit>_eVal`, one row per query gene
pub fn reciprocal_columns(kit: &str, hits: &[ReciprocalHit]) -> AnnotationTable {
    let hit_col = format!("{}_hit", kit);
    let rbh_col = format!("{}_RBH", kit);
    let identity_col = format!("{}_identity", kit);
    let bit_col = format!("{}_bitScore", kit);
    let evalue_col = format!("{}_eVal", kit);

    let mut table = AnnotationTable::with_columns([&hit_col, &rbh_col, &identity_col, &bit_col, &evalue_col]);
    for hit in hits {
        table.set(&hit.query_id, &hit_col, hit.target_id.as_str());
        table.set(&hit.query_id, &rbh_col, if hit.is_reciprocal { "True" } else { "False" });
        table.set(&hit.query_id, &identity_col, hit.identity.to_string());
        table.set(&hit.query_id, &bit_col, hit.bit_score.to_string());
        table.set(&hit.query_id, &evalue_col, format!("{:e}", hit.evalue));
    }
    table
}

/// Runs forward and reverse searches for one kit against one gene batch.
///
/// All tool outputs land under `work_dir`, which must be private to the
/// (kit, batch) pair.
pub struct AlignmentProtocol<'a> {
    search: &'a dyn SequenceSearch,
    work_dir: PathBuf,
}

impl<'a> AlignmentProtocol<'a> {
    pub fn new(search: &'a dyn SequenceSearch, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            search,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Each query's top-ranked hit, dropped when it scores under `bit_score_threshold`
    pub fn best_hits(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        bit_score_threshold: f64,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>> {
        let hits = self.search.search(query, target, &self.work_dir, threads)?;
        let best: Vec<AlignmentHit> = top_hit_per_query(hits)
            .into_iter()
            .filter(|hit| hit.bit_score >= bit_score_threshold)
            .collect();
        tracing::debug!(
            "{} queries of {} have a best hit in {} at bit score >= {}",
            best.len(),
            query.stem(),
            target.stem(),
            bit_score_threshold
        );
        Ok(best)
    }

    /// Best hits of the forward targets searched back against the query genes.
    ///
    /// Returns an empty table without running the reverse search when the
    /// forward search found nothing.
    pub fn reciprocal_best_hits(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        bit_score_threshold: f64,
        rbh_bit_score_threshold: f64,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>> {
        let forward = self.best_hits(query, target, bit_score_threshold, threads)?;
        self.reverse_best_hits(&forward, query, target, rbh_bit_score_threshold, threads)
    }

    /// Reverse half of [`Self::reciprocal_best_hits`] for an existing forward result
    pub fn reverse_best_hits(
        &self,
        forward: &[AlignmentHit],
        query: &SeqIndex,
        target: &SeqIndex,
        rbh_bit_score_threshold: f64,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>> {
        if forward.is_empty() {
            tracing::debug!("No forward hits against {}, skipping reverse search", target.stem());
            return Ok(Vec::new());
        }

        let ids: Vec<String> = forward
            .iter()
            .map(|hit| hit.target_id.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let subset_path = self.work_dir.join(format!("{}.hits.mmsdb", target.stem()));
        let subset = self.search.create_subindex(target, &ids, &subset_path)?;

        self.best_hits(&subset, query, rbh_bit_score_threshold, threads)
    }

    /// Forward search plus reciprocity classification
    pub fn search_with_reciprocity(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        bit_score_threshold: f64,
        rbh_bit_score_threshold: f64,
        threads: usize,
    ) -> Result<Vec<ReciprocalHit>> {
        let forward = self.best_hits(query, target, bit_score_threshold, threads)?;
        if forward.is_empty() {
            return Ok(Vec::new());
        }
        let reverse =
            self.reverse_best_hits(&forward, query, target, rbh_bit_score_threshold, threads)?;
        Ok(classify_reciprocal(&forward, &reverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_hit_keeps_first_row_per_query() {
        let hits = vec![
            AlignmentHit::new("g1", "P1", 100.0, 1e-20),
            AlignmentHit::new("g1", "P2", 300.0, 1e-80),
            AlignmentHit::new("g2", "P3", 50.0, 1e-5),
        ];
        let top = top_hit_per_query(hits);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].target_id, "P1");
        assert_eq!(top[1].target_id, "P3");
    }

    #[test]
    fn test_classify_reciprocal() {
        let forward = vec![
            AlignmentHit::new("g1", "P1", 400.0, 1e-100),
            AlignmentHit::new("g2", "P2", 380.0, 1e-90),
            AlignmentHit::new("g3", "P3", 90.0, 1e-20),
        ];
        let reverse = vec![
            AlignmentHit::new("P1", "g1", 400.0, 1e-100),
            AlignmentHit::new("P2", "g7", 390.0, 1e-95),
        ];
        let classified = classify_reciprocal(&forward, &reverse);
        let flags: Vec<bool> = classified.iter().map(|h| h.is_reciprocal).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_reciprocal_columns() {
        let hits = vec![ReciprocalHit {
            query_id: "g1".to_string(),
            target_id: "MER0001".to_string(),
            is_reciprocal: true,
            identity: 0.9,
            bit_score: 400.0,
            evalue: 1e-100,
        }];
        let table = reciprocal_columns("peptidase", &hits);
        assert_eq!(
            table.columns().collect::<Vec<_>>(),
            vec![
                "peptidase_hit",
                "peptidase_RBH",
                "peptidase_identity",
                "peptidase_bitScore",
                "peptidase_eVal"
            ]
        );
        assert_eq!(table.get("g1", "peptidase_hit"), Some("MER0001"));
        assert_eq!(table.get("g1", "peptidase_RBH"), Some("True"));
        assert_eq!(table.get("g1", "peptidase_bitScore"), Some("400"));
        assert_eq!(table.get("g1", "peptidase_eVal"), Some("1e-100"));
    }
}
