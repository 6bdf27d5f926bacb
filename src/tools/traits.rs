/// Trait definitions for the external search tools
///
/// Kits talk to these interfaces only, so the real MMseqs2/HMMER wrappers can be
/// swapped for the in-memory fakes in `crate::testing`.
use crate::Result;
use std::path::{Path, PathBuf};

/// One row of a BLAST-style tabular result (outfmt 6)
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_id: String,
    pub target_id: String,
    pub identity: f64,
    pub alignment_length: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub evalue: f64,
    pub bit_score: f64,
}

impl AlignmentHit {
    /// Minimal hit with the fields the reciprocal search looks at.
    pub fn new(query_id: &str, target_id: &str, bit_score: f64, evalue: f64) -> Self {
        Self {
            query_id: query_id.to_string(),
            target_id: target_id.to_string(),
            identity: 0.0,
            alignment_length: 0,
            mismatches: 0,
            gap_opens: 0,
            query_start: 0,
            query_end: 0,
            target_start: 0,
            target_end: 0,
            evalue,
            bit_score,
        }
    }

    pub fn with_identity(mut self, identity: f64) -> Self {
        self.identity = identity;
        self
    }
}

/// One domain row of an HMMER `--domtblout` table.
///
/// Names follow the gene-centric view used throughout annotation: the
/// "query" is the called gene and the "target" is the profile it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainHit {
    pub query_id: String,
    pub query_accession: String,
    pub query_length: usize,
    pub target_id: String,
    pub target_accession: String,
    pub target_length: usize,
    pub full_evalue: f64,
    pub full_score: f64,
    pub full_bias: f64,
    pub domain_number: usize,
    pub domain_count: usize,
    pub domain_cevalue: f64,
    pub domain_ievalue: f64,
    pub domain_score: f64,
    pub domain_bias: f64,
    pub target_start: usize,
    pub target_end: usize,
    pub alignment_start: usize,
    pub alignment_end: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub accuracy: f64,
    pub description: String,
}

impl DomainHit {
    /// Fraction of the profile covered by the alignment
    pub fn coverage(&self) -> f64 {
        if self.target_length == 0 {
            return 0.0;
        }
        (self.target_end as f64 - self.target_start as f64) / self.target_length as f64
    }
}

/// Handle to a searchable sequence index on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeqIndex {
    path: PathBuf,
}

impl SeqIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem used to name search outputs
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string())
    }
}

/// Sequence-vs-sequence search primitive (MMseqs2 in production)
pub trait SequenceSearch: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Build a searchable index from a FASTA file. Reuses `index` if it already exists.
    fn create_index(&self, fasta: &Path, index: &Path, threads: usize) -> Result<SeqIndex>;

    /// Search `query` against `target`, returning rows in the tool's ranked order.
    ///
    /// All intermediate files go under `work_dir`.
    fn search(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>>;

    /// Restrict `source` to the entries named in `ids`, writing the subset to `output`.
    fn create_subindex(&self, source: &SeqIndex, ids: &[String], output: &Path) -> Result<SeqIndex>;

    /// Verify that the tool is properly installed
    fn verify_installation(&self) -> Result<()> {
        Ok(())
    }
}

/// Profile HMM search primitive (HMMER in production)
pub trait ProfileSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare a profile database for searching (hmmpress). Idempotent.
    fn prepare_profiles(&self, profiles: &Path) -> Result<()>;

    /// Search every gene in `genes` against `profiles`.
    ///
    /// A search with no hits returns an empty list.
    fn search(
        &self,
        genes: &Path,
        profiles: &Path,
        work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<DomainHit>>;

    fn verify_installation(&self) -> Result<()> {
        Ok(())
    }
}
