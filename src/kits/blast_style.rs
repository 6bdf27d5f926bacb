use crate::annotate::alignment::{reciprocal_columns, AlignmentProtocol};
use crate::annotate::batch::GeneBatch;
use crate::annotate::table::AnnotationTable;
use crate::kits::{KitContext, SearchContext};
use crate::tools::traits::{SeqIndex, SequenceSearch};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Reciprocal-best-hit search of gene batches against one sequence database
pub struct BlastStyleDb {
    kit: String,
    target: SeqIndex,
    search: Arc<dyn SequenceSearch>,
    bit_score_threshold: f64,
    rbh_bit_score_threshold: f64,
}

impl BlastStyleDb {
    pub fn new(kit: &str, target: &Path, ctx: &KitContext) -> Self {
        Self {
            kit: kit.to_string(),
            target: SeqIndex::new(target),
            search: Arc::clone(&ctx.search),
            bit_score_threshold: ctx.settings.bit_score_threshold,
            rbh_bit_score_threshold: ctx.settings.rbh_bit_score_threshold,
        }
    }

    pub fn target(&self) -> &SeqIndex {
        &self.target
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.bit_score_threshold, self.rbh_bit_score_threshold)
    }

    /// `<kit>_hit`, `<kit>_RBH`, `<kit>_identity`, `<kit>_bitScore`, `<kit>_eVal`
    pub fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        let protocol = AlignmentProtocol::new(self.search.as_ref(), &ctx.work_dir);
        let hits = protocol.search_with_reciprocity(
            batch.index()?,
            &self.target,
            self.bit_score_threshold,
            self.rbh_bit_score_threshold,
            ctx.threads,
        )?;
        tracing::debug!(
            "{}: {} of batch {} have a best hit ({} reciprocal)",
            self.kit,
            hits.len(),
            batch.name,
            hits.iter().filter(|h| h.is_reciprocal).count()
        );
        Ok(reciprocal_columns(&self.kit, &hits))
    }
}
