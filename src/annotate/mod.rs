//! Annotation engine: reciprocal-best-hit search, hit formatting, the
//! per-batch orchestrator, and merging runs into the persisted table.

pub mod alignment;
pub mod batch;
pub mod descriptions;
pub mod formatter;
pub mod ids;
pub mod merge;
pub mod orchestrator;
pub mod pipeline;
pub mod table;

pub use batch::GeneBatch;
pub use merge::{merge_past_annotations, MergeReport};
pub use orchestrator::{SearchOrchestrator, ThreadPlan};
pub use table::{AnnotationTable, ColumnCollision};

/// Column holding the batch each gene came from
pub const FASTA_COL: &str = "fasta";
/// Column holding a gene's id within its batch
pub const GENE_ID_COL: &str = "gene_ids";
