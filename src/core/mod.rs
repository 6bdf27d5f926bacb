pub mod config;
pub mod paths;
pub mod project;

pub use config::{AnnotateSettings, KitsConfig};
pub use project::{GeneBatchRecord, ProjectMeta, RunMetadata};
