//! Filtering and summarising profile (HMM) search hits.

use crate::tools::traits::DomainHit;
use crate::{AnnotError, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_MIN_COVERAGE: f64 = 0.35;
pub const DEFAULT_MAX_EVALUE: f64 = 1e-15;

/// Coverage and e-value gate for a domain hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceFilter {
    pub min_coverage: f64,
    pub max_evalue: f64,
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            max_evalue: DEFAULT_MAX_EVALUE,
        }
    }
}

impl SignificanceFilter {
    pub fn with_max_evalue(mut self, max_evalue: f64) -> Self {
        self.max_evalue = max_evalue;
        self
    }

    pub fn is_significant(&self, hit: &DomainHit) -> bool {
        hit.coverage() >= self.min_coverage && hit.full_evalue <= self.max_evalue
    }

    pub fn apply(&self, hits: Vec<DomainHit>) -> Vec<DomainHit> {
        hits.into_iter().filter(|h| self.is_significant(h)).collect()
    }
}

/// Lowest full-sequence e-value per query; the earliest row wins ties.
///
/// Queries come out in order of first appearance.
pub fn top_hit_by_evalue(hits: &[DomainHit]) -> Vec<&DomainHit> {
    let mut best: IndexMap<&str, &DomainHit> = IndexMap::new();
    for hit in hits {
        match best.get_mut(hit.query_id.as_str()) {
            Some(current) if hit.full_evalue < current.full_evalue => *current = hit,
            Some(_) => {}
            None => {
                best.insert(hit.query_id.as_str(), hit);
            }
        }
    }
    best.into_values().collect()
}

/// Hits grouped by query, queries in order of first appearance
pub fn group_by_query(hits: &[DomainHit]) -> IndexMap<&str, Vec<&DomainHit>> {
    let mut groups: IndexMap<&str, Vec<&DomainHit>> = IndexMap::new();
    for hit in hits {
        groups.entry(hit.query_id.as_str()).or_default().push(hit);
    }
    groups
}

/// Distinct values in first-seen order, joined with `"; "`
pub fn join_unique<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: IndexSet<String> = values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    unique.into_iter().collect::<Vec<_>>().join("; ")
}

/// Which score a per-profile threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreType {
    Domain,
    Full,
    /// `-` in the table: the profile has no calibrated threshold
    Unscored,
}

impl std::str::FromStr for ScoreType {
    type Err = AnnotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "domain" => Ok(ScoreType::Domain),
            "full" => Ok(ScoreType::Full),
            "-" | "" => Ok(ScoreType::Unscored),
            other => Err(AnnotError::Parse(format!("unknown score type {}", other))),
        }
    }
}

/// Per-profile metadata table (cutoffs, definitions) keyed by profile name.
///
/// Read from a tab-separated file whose first column is the profile name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutoffTable {
    rows: HashMap<String, HashMap<String, String>>,
}

impl CutoffTable {
    pub fn read_tsv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| AnnotError::Parse(format!("{}: {}", path.display(), e)))?;
        let headers = reader.headers()?.clone();

        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| AnnotError::Parse(format!("{}: {}", path.display(), e)))?;
            let mut fields = record.iter();
            let Some(profile) = fields.next() else {
                continue;
            };
            let values = headers
                .iter()
                .skip(1)
                .zip(fields)
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            rows.insert(profile.to_string(), values);
        }
        tracing::debug!("Read metadata for {} profiles from {}", rows.len(), path.display());
        Ok(Self { rows })
    }

    pub fn insert(&mut self, profile: &str, column: &str, value: &str) {
        self.rows
            .entry(profile.to_string())
            .or_default()
            .insert(column.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, profile: &str) -> bool {
        self.rows.contains_key(profile)
    }

    pub fn get(&self, profile: &str, column: &str) -> Option<&str> {
        self.rows.get(profile)?.get(column).map(String::as_str)
    }

    /// Numeric cell; `-` and unparsable text read as absent
    pub fn number(&self, profile: &str, column: &str) -> Option<f64> {
        self.get(profile, column)?.trim().parse().ok()
    }

    pub fn definition(&self, profile: &str) -> Option<&str> {
        self.get(profile, "definition").filter(|d| !d.is_empty())
    }
}

/// Keep hits scoring strictly above their profile's calibrated threshold.
///
/// The table's `score_type` column picks domain or full-sequence score.
/// Profiles marked `-`, or missing from the table, never pass.
pub fn sig_scores(hits: Vec<DomainHit>, cutoffs: &CutoffTable) -> Result<Vec<DomainHit>> {
    let mut kept = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(score_type) = cutoffs.get(&hit.target_id, "score_type") else {
            tracing::debug!("No cutoff recorded for profile {}", hit.target_id);
            continue;
        };
        let score = match score_type.parse::<ScoreType>()? {
            ScoreType::Domain => hit.domain_score,
            ScoreType::Full => hit.full_score,
            ScoreType::Unscored => continue,
        };
        if let Some(threshold) = cutoffs.number(&hit.target_id, "threshold") {
            if score > threshold {
                kept.push(hit);
            }
        }
    }
    Ok(kept)
}
