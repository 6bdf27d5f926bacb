//! Mock search tools for testing kits and the orchestrator without MMseqs2 or HMMER

use crate::tools::traits::{AlignmentHit, DomainHit, ProfileSearch, SeqIndex, SequenceSearch};
use crate::{AnnotError, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One recorded call to [`MockSearch::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: PathBuf,
    pub target: PathBuf,
    pub threads: usize,
}

/// Sequence search that answers from canned hit lists.
///
/// Hits are registered per (query index, target index) pair. A sub-index made
/// by `create_subindex` answers with its parent's hits, restricted to the
/// sequences it kept. Searches touching an index marked with `fail_on` fail
/// the way a crashed tool would.
#[derive(Default)]
pub struct MockSearch {
    hits: Mutex<HashMap<(PathBuf, PathBuf), Vec<AlignmentHit>>>,
    subsets: Mutex<HashMap<PathBuf, (PathBuf, HashSet<String>)>>,
    failing: Mutex<HashSet<PathBuf>>,
    calls: Mutex<Vec<SearchCall>>,
    index_builds: Mutex<Vec<PathBuf>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(
        self,
        query: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        hits: Vec<AlignmentHit>,
    ) -> Self {
        self.add_hits(query, target, hits);
        self
    }

    pub fn add_hits(&self, query: impl Into<PathBuf>, target: impl Into<PathBuf>, hits: Vec<AlignmentHit>) {
        lock(&self.hits).insert((query.into(), target.into()), hits);
    }

    /// Make every later search with `index` as query or target fail
    pub fn fail_on(&self, index: impl Into<PathBuf>) {
        lock(&self.failing).insert(index.into());
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        lock(&self.calls).clone()
    }

    /// FASTA files an index was actually built from
    pub fn index_builds(&self) -> Vec<PathBuf> {
        lock(&self.index_builds).clone()
    }
}

impl SequenceSearch for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    fn create_index(&self, fasta: &Path, index: &Path, _threads: usize) -> Result<SeqIndex> {
        if !index.exists() {
            if let Some(parent) = index.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(index, fasta.display().to_string())?;
            lock(&self.index_builds).push(fasta.to_path_buf());
        }
        Ok(SeqIndex::new(index))
    }

    fn search(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        _work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>> {
        lock(&self.calls).push(SearchCall {
            query: query.path().to_path_buf(),
            target: target.path().to_path_buf(),
            threads,
        });

        let subset = lock(&self.subsets).get(query.path()).cloned();
        let (root, kept) = match subset {
            Some((parent, ids)) => (parent, Some(ids)),
            None => (query.path().to_path_buf(), None),
        };

        if let Some(bad) = [root.as_path(), target.path()]
            .into_iter()
            .find(|p| lock(&self.failing).contains(*p))
        {
            return Err(AnnotError::external(
                self.name(),
                format!("search against {} exited with status 1", bad.display()),
            ));
        }

        let hits = lock(&self.hits)
            .get(&(root, target.path().to_path_buf()))
            .cloned()
            .unwrap_or_default();
        Ok(match kept {
            Some(ids) => hits.into_iter().filter(|h| ids.contains(&h.query_id)).collect(),
            None => hits,
        })
    }

    fn create_subindex(&self, source: &SeqIndex, ids: &[String], output: &Path) -> Result<SeqIndex> {
        lock(&self.subsets).insert(
            output.to_path_buf(),
            (source.path().to_path_buf(), ids.iter().cloned().collect()),
        );
        Ok(SeqIndex::new(output))
    }
}

/// One recorded call to [`MockProfileSearch::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCall {
    pub genes: PathBuf,
    pub profiles: PathBuf,
    pub threads: usize,
}

/// Profile search that answers from canned domain hits keyed by (genes, profiles)
#[derive(Default)]
pub struct MockProfileSearch {
    hits: Mutex<HashMap<(PathBuf, PathBuf), Vec<DomainHit>>>,
    failing: Mutex<HashSet<PathBuf>>,
    calls: Mutex<Vec<ProfileCall>>,
    prepared: Mutex<Vec<PathBuf>>,
}

impl MockProfileSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(
        self,
        genes: impl Into<PathBuf>,
        profiles: impl Into<PathBuf>,
        hits: Vec<DomainHit>,
    ) -> Self {
        self.add_hits(genes, profiles, hits);
        self
    }

    pub fn add_hits(&self, genes: impl Into<PathBuf>, profiles: impl Into<PathBuf>, hits: Vec<DomainHit>) {
        lock(&self.hits).insert((genes.into(), profiles.into()), hits);
    }

    /// Make every later search of `profiles` fail
    pub fn fail_on(&self, profiles: impl Into<PathBuf>) {
        lock(&self.failing).insert(profiles.into());
    }

    pub fn calls(&self) -> Vec<ProfileCall> {
        lock(&self.calls).clone()
    }

    pub fn prepared(&self) -> Vec<PathBuf> {
        lock(&self.prepared).clone()
    }
}

impl ProfileSearch for MockProfileSearch {
    fn name(&self) -> &str {
        "mock-profile-search"
    }

    fn prepare_profiles(&self, profiles: &Path) -> Result<()> {
        lock(&self.prepared).push(profiles.to_path_buf());
        Ok(())
    }

    fn search(
        &self,
        genes: &Path,
        profiles: &Path,
        _work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<DomainHit>> {
        lock(&self.calls).push(ProfileCall {
            genes: genes.to_path_buf(),
            profiles: profiles.to_path_buf(),
            threads,
        });
        if lock(&self.failing).contains(profiles) {
            return Err(AnnotError::external(
                self.name(),
                format!("hmmsearch on {} exited with status 1", profiles.display()),
            ));
        }
        Ok(lock(&self.hits)
            .get(&(genes.to_path_buf(), profiles.to_path_buf()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Domain hit with full profile coverage and a strong e-value; adjust fields as needed
pub fn domain_hit(query_id: &str, target_id: &str) -> DomainHit {
    DomainHit {
        query_id: query_id.to_string(),
        query_accession: "-".to_string(),
        query_length: 300,
        target_id: target_id.to_string(),
        target_accession: "-".to_string(),
        target_length: 100,
        full_evalue: 1e-30,
        full_score: 150.0,
        full_bias: 0.0,
        domain_number: 1,
        domain_count: 1,
        domain_cevalue: 1e-32,
        domain_ievalue: 1e-30,
        domain_score: 140.0,
        domain_bias: 0.0,
        target_start: 1,
        target_end: 100,
        alignment_start: 5,
        alignment_end: 280,
        query_start: 1,
        query_end: 290,
        accuracy: 0.95,
        description: "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subindex_restricts_reverse_hits() {
        let search = MockSearch::new().with_hits(
            "/db/target.mmsdb",
            "/genes/A.mmsdb",
            vec![
                AlignmentHit::new("P1", "g1", 400.0, 1e-100),
                AlignmentHit::new("P2", "g2", 400.0, 1e-100),
            ],
        );
        let sub = search
            .create_subindex(&SeqIndex::new("/db/target.mmsdb"), &["P2".to_string()], Path::new("/w/sub"))
            .unwrap();
        let hits = search
            .search(&sub, &SeqIndex::new("/genes/A.mmsdb"), Path::new("/w"), 4)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query_id, "P2");
        assert_eq!(search.calls()[0].threads, 4);
    }

    #[test]
    fn test_failing_index_fails_search_and_its_subindexes() {
        let search = MockSearch::new();
        search.fail_on("/db/target.mmsdb");
        let target = SeqIndex::new("/db/target.mmsdb");
        let genes = SeqIndex::new("/genes/A.mmsdb");

        let err = search.search(&genes, &target, Path::new("/w"), 1).unwrap_err();
        assert_eq!(err.exit_code(), 4);

        let sub = search
            .create_subindex(&target, &["P1".to_string()], Path::new("/w/sub"))
            .unwrap();
        assert!(search.search(&sub, &genes, Path::new("/w"), 1).is_err());
        assert!(search.search(&genes, &SeqIndex::new("/db/other.mmsdb"), Path::new("/w"), 1).is_ok());
        assert_eq!(search.calls().len(), 3);
    }

    #[test]
    fn test_failing_profiles_fail_profile_search() {
        let profile = MockProfileSearch::new();
        profile.fail_on("/db/kofam.hmm");
        assert!(profile
            .search(Path::new("/genes/A.faa"), Path::new("/db/kofam.hmm"), Path::new("/w"), 2)
            .is_err());
        assert!(profile
            .search(Path::new("/genes/A.faa"), Path::new("/db/dbcan.hmm"), Path::new("/w"), 2)
            .unwrap()
            .is_empty());
        assert_eq!(profile.calls().len(), 2);
    }
}
