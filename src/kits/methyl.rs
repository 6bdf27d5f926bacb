use crate::annotate::batch::GeneBatch;
use crate::annotate::table::AnnotationTable;
use crate::kits::blast_style::BlastStyleDb;
use crate::kits::{DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::Result;
use std::path::{Path, PathBuf};

pub const NAME: &str = "methyl";
pub const FORMAL_NAME: &str = "Methyl";
pub const CITATION: &str = "Methyl is an in-house database of methylotrophy genes";

/// Methylotrophy marker database, searched by reciprocal best hit.
///
/// The hit column is published as `methyl_id`.
pub struct MethylKit {
    db: BlastStyleDb,
    genome_summary: Option<PathBuf>,
    settings: KitSettings,
}

pub fn build(ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    let mmsdb = ctx.config.require_path(NAME, "mmsdb")?;
    let genome_summary = ctx.config.optional_path(NAME, "genome_summary_form")?;
    let db = BlastStyleDb::new(NAME, &mmsdb, ctx);
    let (bit, rbh) = db.thresholds();

    Ok(Box::new(MethylKit {
        db,
        genome_summary,
        settings: KitSettings::new("blast_style")
            .with_files(ctx.config.kit_entries(NAME))
            .with_param("bit_score_threshold", bit)
            .with_param("rbh_bit_score_threshold", rbh),
    }))
}

impl DatabaseKit for MethylKit {
    fn name(&self) -> &str {
        NAME
    }

    fn formal_name(&self) -> &str {
        FORMAL_NAME
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn genome_summary(&self) -> Option<&Path> {
        self.genome_summary.as_deref()
    }

    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        let mut hits = self.db.search(batch, ctx)?;
        hits.rename_column(&format!("{}_hit", NAME), &format!("{}_id", NAME))?;
        Ok(hits)
    }

    fn settings(&self) -> KitSettings {
        self.settings.clone()
    }
}
