use crate::annotate::batch::GeneBatch;
use crate::core::config::{AnnotateSettings, FileEntry, KitsConfig};
use crate::kits::{KitContext, SearchContext};
use crate::testing::mock::{MockProfileSearch, MockSearch};
use crate::tools::traits::{AlignmentHit, DomainHit, ProfileSearch, SequenceSearch};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Kit configuration, settings and mock tools rooted in one scratch directory
pub struct KitHarness {
    pub root: PathBuf,
    pub config: KitsConfig,
    pub settings: AnnotateSettings,
    pub search: Arc<MockSearch>,
    pub profile: Arc<MockProfileSearch>,
    working_dir: PathBuf,
}

impl KitHarness {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config: KitsConfig::default(),
            settings: AnnotateSettings::default(),
            search: Arc::new(MockSearch::new()),
            profile: Arc::new(MockProfileSearch::new()),
            working_dir: root.join("work"),
        }
    }

    /// Create an empty database file under `<root>/db`
    pub fn touch(&self, name: &str) -> PathBuf {
        self.write(name, "")
    }

    /// Create a database file under `<root>/db` with the given contents
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join("db").join(name);
        std::fs::create_dir_all(self.root.join("db")).expect("create db dir");
        std::fs::write(&path, contents).expect("write db file");
        path
    }

    pub fn with_file(mut self, kit: &str, key: &str, path: &Path) -> Self {
        self.config.kits.entry(kit.to_string()).or_default().insert(
            key.to_string(),
            FileEntry {
                location: path.to_path_buf(),
                version: None,
                notes: None,
            },
        );
        self
    }

    pub fn with_settings(mut self, edit: impl FnOnce(&mut AnnotateSettings)) -> Self {
        edit(&mut self.settings);
        self
    }

    /// Batch `<root>/<name>.faa`, indexed under `<root>/genes/<name>`
    pub fn batch(&self, name: &str) -> GeneBatch {
        GeneBatch::for_fasta(&self.root, &self.root.join(format!("{}.faa", name)))
            .expect("batch name")
    }

    /// Like [`Self::batch`], writing the FASTA text first
    pub fn batch_with_genes(&self, name: &str, fasta: &str) -> GeneBatch {
        let batch = self.batch(name);
        std::fs::write(&batch.faa, fasta).expect("write gene fasta");
        batch
    }

    pub fn search_hits(&self, query: &Path, target: &Path, hits: Vec<AlignmentHit>) {
        self.search.add_hits(query, target, hits);
    }

    pub fn profile_hits(&self, genes: &Path, profiles: &Path, hits: Vec<DomainHit>) {
        self.profile.add_hits(genes, profiles, hits);
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn context(&self) -> KitContext<'_> {
        let search: Arc<dyn SequenceSearch> = self.search.clone();
        let profile: Arc<dyn ProfileSearch> = self.profile.clone();
        KitContext {
            config: &self.config,
            settings: &self.settings,
            search,
            profile,
            working_dir: &self.working_dir,
        }
    }

    pub fn search_context(&self, batch: &str) -> SearchContext {
        SearchContext {
            threads: self.settings.threads,
            work_dir: self.working_dir.join(batch),
        }
    }
}
