use crate::core::config::AnnotateSettings;
use crate::core::paths::{resolve_under, write_atomic, PROJECT_META};
use crate::kits::KitSettings;
use crate::{AnnotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// What one annotation run did, persisted so later runs can merge onto it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// Annotation table, relative to the project directory
    pub annotations_tsv: PathBuf,
    pub working_dir: PathBuf,
    /// Every database ever applied to this project's batches
    pub used_dbs: BTreeSet<String>,
    pub batch_names: BTreeSet<String>,
    pub settings: AnnotateSettings,
    #[serde(default)]
    pub kit_settings: BTreeMap<String, KitSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationHistory {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub runs: BTreeMap<String, RunMetadata>,
}

/// A registered gene batch: one called-gene FASTA, typically one genome bin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneBatchRecord {
    pub name: String,
    /// Protein FASTA, relative to the project directory when it lives inside it
    pub faa: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
}

/// Contents of `project_meta.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub annotations: AnnotationHistory,
    #[serde(default)]
    pub batches: Vec<GeneBatchRecord>,
}

impl ProjectMeta {
    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_META)
    }

    /// Load the project document; a project without one starts empty
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path(project_dir);
        if !path.exists() {
            tracing::debug!("No project metadata at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| {
            AnnotError::Serialization(format!("{} is not valid project metadata: {}", path.display(), e))
        })
    }

    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(&Self::path(project_dir), contents.as_bytes())
    }

    pub fn latest_run(&self) -> Option<&RunMetadata> {
        let latest = self.annotations.latest.as_ref()?;
        self.annotations.runs.get(latest)
    }

    /// Record a finished run and make it the latest.
    ///
    /// `used_dbs` is widened with every earlier run's set so it only grows.
    pub fn record_run(&mut self, mut run: RunMetadata) {
        if let Some(previous) = self.latest_run() {
            run.used_dbs.extend(previous.used_dbs.iter().cloned());
        }
        self.annotations.latest = Some(run.run_id.clone());
        self.annotations.runs.insert(run.run_id.clone(), run);
    }

    pub fn batch(&self, name: &str) -> Option<&GeneBatchRecord> {
        self.batches.iter().find(|b| b.name == name)
    }

    /// Register a gene batch. Re-registering the same FASTA is a no-op.
    pub fn register_batch(&mut self, record: GeneBatchRecord) -> Result<()> {
        match self.batches.iter_mut().find(|b| b.name == record.name) {
            Some(existing) if existing.faa == record.faa => {
                if record.index.is_some() {
                    existing.index = record.index;
                }
                Ok(())
            }
            Some(existing) => Err(AnnotError::Usage(format!(
                "gene batch name {} is already used by {}; rename {}",
                record.name,
                existing.faa.display(),
                record.faa.display()
            ))),
            None => {
                self.batches.push(record);
                Ok(())
            }
        }
    }

    /// Annotation table of the latest run, if it recorded one.
    ///
    /// A recorded table that is gone from disk is an error, not an empty history.
    pub fn latest_annotations(&self, project_dir: &Path) -> Result<Option<PathBuf>> {
        let Some(run) = self.latest_run() else {
            return Ok(None);
        };
        let path = resolve_under(project_dir, &run.annotations_tsv);
        if !path.exists() {
            return Err(AnnotError::Usage(format!(
                "run {} recorded annotations at {} but the file is missing; \
                 restore it or pass an existing annotations table explicitly",
                run.run_id,
                path.display()
            )));
        }
        Ok(Some(path))
    }
}
