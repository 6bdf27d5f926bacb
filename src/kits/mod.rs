//! Database kits: one per reference database, each turning a gene batch into
//! namespaced annotation columns.

pub mod blast_style;
pub mod custom;
pub mod dbcan;
pub mod fegenie;
pub mod heme;
pub mod kofam;
pub mod methyl;
pub mod peptidase;
pub mod profile;
pub mod registry;
pub mod sets;

pub use registry::{KitDescriptor, KitRegistry};

use crate::annotate::batch::GeneBatch;
use crate::annotate::table::AnnotationTable;
use crate::core::config::{AnnotateSettings, FileEntry, KitsConfig};
use crate::tools::traits::{ProfileSearch, SequenceSearch};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const NO_CITATION: &str = "No citation available";

/// Everything a kit may read while it is being configured
pub struct KitContext<'a> {
    pub config: &'a KitsConfig,
    pub settings: &'a AnnotateSettings,
    pub search: Arc<dyn SequenceSearch>,
    pub profile: Arc<dyn ProfileSearch>,
    /// Run working directory; kits keep their own files under `<working_dir>/<kit>`
    pub working_dir: &'a Path,
}

impl KitContext<'_> {
    pub fn kit_dir(&self, kit: &str) -> PathBuf {
        self.working_dir.join(kit)
    }
}

/// Per-call search parameters, decided by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    pub threads: usize,
    /// Private to one (kit, batch) pair
    pub work_dir: PathBuf,
}

/// Record of how a kit was configured, stored with the run metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitSettings {
    pub search_type: String,
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl KitSettings {
    pub fn new(search_type: &str) -> Self {
        Self {
            search_type: search_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_files(mut self, files: BTreeMap<String, FileEntry>) -> Self {
        self.files = files;
        self
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

/// A configured database kit.
///
/// Construction does all configuration (see [`KitDescriptor`]), so a kit
/// value is always ready to search. Search results are keyed by the batch's
/// local gene ids; the orchestrator adds the batch prefix.
pub trait DatabaseKit: Send + Sync {
    fn name(&self) -> &str;

    fn formal_name(&self) -> &str;

    fn citation(&self) -> &str {
        NO_CITATION
    }

    /// Upper bound on useful threads for this kit's search
    fn max_threads(&self) -> Option<usize> {
        None
    }

    /// Whether [`Self::get_ids`] yields identifiers
    fn can_get_ids(&self) -> bool {
        true
    }

    /// Genome summary form shipped with the database, if any
    fn genome_summary(&self) -> Option<&Path> {
        None
    }

    /// Annotate one gene batch
    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable>;

    /// Extra description columns for the combined annotations of every batch
    fn get_descriptions(&self, _annotations: &AnnotationTable) -> Result<AnnotationTable> {
        tracing::debug!("{} adds no descriptions", self.name());
        Ok(AnnotationTable::new())
    }

    /// Database identifiers this kit assigned to one annotated gene
    fn get_ids(&self, annotations: &AnnotationTable, row: &str) -> Vec<String> {
        ids_in_cell(annotations, row, &format!("{}_id", self.name()), "; ")
    }

    fn settings(&self) -> KitSettings;
}

/// Split a cell into ids; absent columns and empty cells give nothing
pub fn ids_in_cell(annotations: &AnnotationTable, row: &str, column: &str, separator: &str) -> Vec<String> {
    if !annotations.has_column(column) {
        tracing::debug!("Expected {} in annotations but it was not found", column);
        return Vec::new();
    }
    annotations
        .get(row, column)
        .map(|cell| {
            cell.split(separator)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
