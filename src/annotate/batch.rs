use crate::core::paths::{relative_to, resolve_under, GENES_DIR};
use crate::core::project::GeneBatchRecord;
use crate::tools::traits::{SeqIndex, SequenceSearch};
use crate::{AnnotError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One called-gene protein FASTA and its lazily built search index
#[derive(Debug, Clone)]
pub struct GeneBatch {
    pub name: String,
    pub faa: PathBuf,
    index_path: PathBuf,
    index: Option<SeqIndex>,
}

impl GeneBatch {
    pub fn new(name: impl Into<String>, faa: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            faa: faa.into(),
            index_path: index_path.into(),
            index: None,
        }
    }

    /// Batch for a FASTA, named after its file stem, indexed under the project
    pub fn for_fasta(project_dir: &Path, faa: &Path) -> Result<Self> {
        let name = batch_name(faa)?;
        let index_path = default_index_path(project_dir, &name);
        Ok(Self::new(name, faa, index_path))
    }

    pub fn from_record(project_dir: &Path, record: &GeneBatchRecord) -> Self {
        let index_path = match &record.index {
            Some(index) => resolve_under(project_dir, index),
            None => default_index_path(project_dir, &record.name),
        };
        Self::new(
            record.name.clone(),
            resolve_under(project_dir, &record.faa),
            index_path,
        )
    }

    pub fn to_record(&self, project_dir: &Path) -> GeneBatchRecord {
        GeneBatchRecord {
            name: self.name.clone(),
            faa: relative_to(project_dir, &self.faa),
            index: self
                .index
                .as_ref()
                .map(|idx| relative_to(project_dir, idx.path())),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// The sequence index, once [`Self::ensure_index`] has run
    pub fn index(&self) -> Result<&SeqIndex> {
        self.index.as_ref().ok_or_else(|| {
            AnnotError::Other(format!("gene batch {} has no sequence index yet", self.name))
        })
    }

    /// Build the index on first use; later calls and later runs reuse it
    pub fn ensure_index(&mut self, search: &dyn SequenceSearch, threads: usize) -> Result<&SeqIndex> {
        if self.index.is_none() {
            let index = search.create_index(&self.faa, &self.index_path, threads)?;
            self.index = Some(index);
        }
        self.index()
    }

    /// Global row id for a gene of this batch
    pub fn row_id(&self, gene_id: &str) -> String {
        format!("{}_{}", self.name, gene_id)
    }
}

fn default_index_path(project_dir: &Path, name: &str) -> PathBuf {
    project_dir.join(GENES_DIR).join(name).join("gene.mmsdb")
}

/// Batch name from a FASTA path: its file name without the last extension
pub fn batch_name(faa: &Path) -> Result<String> {
    faa.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnnotError::Usage(format!("cannot name a gene batch after {}", faa.display())))
}

/// Every batch in one run must have its own name
pub fn check_unique_names(batches: &[GeneBatch]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut duplicated: Vec<&str> = batches
        .iter()
        .filter(|b| !seen.insert(b.name.as_str()))
        .map(|b| b.name.as_str())
        .collect();
    if duplicated.is_empty() {
        return Ok(());
    }
    duplicated.dedup();
    Err(AnnotError::Usage(format!(
        "gene batch names must be unique, but {} appear more than once; rename the FASTA files",
        duplicated.join(", ")
    )))
}
