use crate::{AnnotError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use chrono::TimeZone;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

static ANNOKIT_CONFIG: OnceLock<Option<PathBuf>> = OnceLock::new();
static LAST_RUN_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Name of the per-project annotation table
pub const ANNOTATIONS_TSV: &str = "annotations.tsv";
/// Name of the per-project metadata document
pub const PROJECT_META: &str = "project_meta.json";
/// Directory under the project holding per-batch gene indexes
pub const GENES_DIR: &str = "genes";

/// Default kit configuration file.
/// Checks ANNOKIT_CONFIG environment variable, falls back to the user config dir
pub fn default_config_path() -> Option<PathBuf> {
    ANNOKIT_CONFIG
        .get_or_init(|| {
            if let Ok(path) = std::env::var("ANNOKIT_CONFIG") {
                Some(PathBuf::from(path))
            } else {
                dirs::config_dir().map(|d| d.join("annokit").join("config.toml"))
            }
        })
        .clone()
}

/// Timestamped id for one annotation run, e.g. `annotations_20240131093000123`.
///
/// Millisecond resolution; ids issued by one process are strictly increasing.
pub fn run_id(prefix: &str) -> String {
    let now = chrono::Local::now();
    let millis = now.timestamp_millis();
    let previous = LAST_RUN_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(millis.max(last + 1)))
        .unwrap_or(millis);
    let issued = millis.max(previous + 1);
    let stamp = chrono::Local
        .timestamp_millis_opt(issued)
        .single()
        .unwrap_or(now);
    format!("{}_{}", prefix, stamp.format("%Y%m%d%H%M%S%3f"))
}

/// Join `path` onto `root` unless it is already absolute
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Express `path` relative to `root` when it lives under it
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Replace `path` with `contents` via a sibling temp file and a rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AnnotError::Other(format!("{} is not a file path", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        fs::remove_file(&tmp).ok();
        return Err(e.into());
    }
    Ok(())
}
