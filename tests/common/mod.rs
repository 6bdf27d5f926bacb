//! Shared setup for annokit integration tests: a scratch project directory
//! wired to the in-memory search tools.
#![allow(dead_code)]

use annokit::annotate::pipeline::{annotate_project, AnnotateOutcome, AnnotateRequest};
use annokit::core::config::{AnnotateSettings, FileEntry, KitsConfig};
use annokit::kits::KitRegistry;
use annokit::testing::{MockProfileSearch, MockSearch};
use annokit::tools::traits::AlignmentHit;
use annokit::tools::SearchTools;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Five genes; `g3` and `g5` carry heme regulatory motifs
pub const FIVE_GENES: &str = ">g1\nMKTAYIAKQR\n>g2\nMCAACHLLKE\n>g3\nMSSLLKKAAE\n>g4\nMPPQRSTVWA\n>g5\nMCGGCHCAACH\n";

pub struct TestProject {
    temp_dir: TempDir,
    pub project: PathBuf,
    pub config: KitsConfig,
    pub search: Arc<MockSearch>,
    pub profile: Arc<MockProfileSearch>,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let project = temp_dir.path().join("project");
        std::fs::create_dir_all(&project).expect("Failed to create project dir");
        Self {
            temp_dir,
            project,
            config: KitsConfig::default(),
            search: Arc::new(MockSearch::new()),
            profile: Arc::new(MockProfileSearch::new()),
        }
    }

    /// A path outside the project
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Write a gene FASTA outside the project and return its path
    pub fn fasta(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(&format!("{}.faa", name));
        std::fs::write(&path, contents).expect("Failed to write gene FASTA");
        path
    }

    /// Create a database file and point `kit.key` at it
    pub fn configure(&mut self, kit: &str, key: &str, file: &str, contents: &str) -> PathBuf {
        let dir = self.path("db");
        std::fs::create_dir_all(&dir).expect("Failed to create db dir");
        let path = dir.join(file);
        std::fs::write(&path, contents).expect("Failed to write db file");
        self.config.kits.entry(kit.to_string()).or_default().insert(
            key.to_string(),
            FileEntry {
                location: path.clone(),
                version: None,
                notes: None,
            },
        );
        path
    }

    /// Where the pipeline will put a batch's gene index
    pub fn gene_index(&self, batch: &str) -> PathBuf {
        self.project.join("genes").join(batch).join("gene.mmsdb")
    }

    pub fn hits(&self, query: &Path, target: &Path, hits: Vec<AlignmentHit>) {
        self.search.add_hits(query, target, hits);
    }

    pub fn request(&self, fastas: Vec<PathBuf>, dbs: &[&str]) -> AnnotateRequest {
        AnnotateRequest {
            project_dir: self.project.clone(),
            gene_fastas: fastas,
            use_db: dbs.iter().map(|d| d.to_string()).collect(),
            settings: AnnotateSettings {
                threads: 4,
                ..AnnotateSettings::default()
            },
            ..AnnotateRequest::default()
        }
    }

    pub fn tools(&self) -> SearchTools {
        SearchTools::new(self.search.clone(), self.profile.clone())
    }

    pub fn annotate(&self, request: &AnnotateRequest) -> annokit::Result<AnnotateOutcome> {
        annotate_project(request, &self.config, &KitRegistry::builtin(), &self.tools())
    }

    pub fn annotations(&self) -> annokit::AnnotationTable {
        annokit::AnnotationTable::read_tsv(self.project.join("annotations.tsv"))
            .expect("Failed to read annotations.tsv")
    }
}
