use crate::core::paths::{default_config_path, resolve_under};
use crate::{AnnotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Database locations and run defaults, read from `config.toml`.
///
/// ```toml
/// data_folder = "databases"
///
/// [annotate]
/// bit_score_threshold = 60
///
/// [kits.peptidase.mmsdb]
/// location = "peptidases.mmsdb"
/// version = "12.4"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitsConfig {
    /// Root for relative database locations. Relative to the config file itself.
    #[serde(default)]
    pub data_folder: Option<PathBuf>,
    #[serde(default)]
    pub annotate: AnnotateSettings,
    #[serde(default)]
    pub kits: BTreeMap<String, BTreeMap<String, FileEntry>>,
}

/// One database file a kit reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub location: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Knobs shared by every kit in one annotation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateSettings {
    #[serde(default = "default_bit_score_threshold")]
    pub bit_score_threshold: f64,
    #[serde(default = "default_rbh_bit_score_threshold")]
    pub rbh_bit_score_threshold: f64,
    #[serde(default)]
    pub kofam_use_dbcan2_thresholds: bool,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub keep_tmp: bool,
}

fn default_bit_score_threshold() -> f64 {
    60.0
}

fn default_rbh_bit_score_threshold() -> f64 {
    350.0
}

fn default_threads() -> usize {
    10
}

impl Default for AnnotateSettings {
    fn default() -> Self {
        Self {
            bit_score_threshold: default_bit_score_threshold(),
            rbh_bit_score_threshold: default_rbh_bit_score_threshold(),
            kofam_use_dbcan2_thresholds: false,
            threads: default_threads(),
            force: false,
            keep_tmp: false,
        }
    }
}

impl KitsConfig {
    /// Load a config file, resolving `data_folder` against the file's directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnnotError::Configuration(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let mut config: KitsConfig = toml::from_str(&contents)
            .map_err(|e| AnnotError::Configuration(format!("Failed to parse config: {}", e)))?;

        if let Some(folder) = config.data_folder.take() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.data_folder = Some(resolve_under(base, &folder));
        }
        tracing::debug!("Loaded kit configuration from {}", path.display());
        Ok(config)
    }

    /// Explicit path, then `$ANNOKIT_CONFIG`, then the user config directory.
    ///
    /// No file at the default locations yields an empty configuration; kits
    /// that need database files then fail when they are configured.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                tracing::warn!("No annokit config file found, only self-contained kits are usable");
                Ok(Self::default())
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AnnotError::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn entry(&self, kit: &str, key: &str) -> Option<&FileEntry> {
        self.kits.get(kit)?.get(key)
    }

    /// Every file entry configured for `kit`
    pub fn kit_entries(&self, kit: &str) -> BTreeMap<String, FileEntry> {
        self.kits.get(kit).cloned().unwrap_or_default()
    }

    /// Resolve a configured location to an absolute-or-cwd path
    pub fn resolve(&self, location: &Path) -> Result<PathBuf> {
        if location.is_absolute() {
            return Ok(location.to_path_buf());
        }
        match &self.data_folder {
            Some(folder) => Ok(folder.join(location)),
            None => Err(AnnotError::Configuration(format!(
                "{} is a relative path but no data_folder is configured",
                location.display()
            ))),
        }
    }

    /// Path a kit cannot run without. Missing entries and missing files are errors.
    pub fn require_path(&self, kit: &str, key: &str) -> Result<PathBuf> {
        let entry = self.entry(kit, key).ok_or_else(|| {
            AnnotError::Configuration(format!(
                "The {} database needs '{}' but it is not set in the config; \
                 add [kits.{}.{}] with a location",
                kit, key, kit, key
            ))
        })?;
        self.existing(kit, key, entry)
    }

    /// Path a kit can do without. Absent entries are `None`; a configured file must exist.
    pub fn optional_path(&self, kit: &str, key: &str) -> Result<Option<PathBuf>> {
        match self.entry(kit, key) {
            Some(entry) => self.existing(kit, key, entry).map(Some),
            None => Ok(None),
        }
    }

    fn existing(&self, kit: &str, key: &str, entry: &FileEntry) -> Result<PathBuf> {
        let path = self.resolve(&entry.location)?;
        if !path.exists() {
            return Err(AnnotError::Configuration(format!(
                "The {} file '{}' is configured at {} but does not exist",
                kit,
                key,
                path.display()
            )));
        }
        Ok(path)
    }
}
