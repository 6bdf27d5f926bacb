use crate::annotate::batch::GeneBatch;
use crate::annotate::formatter::{top_hit_by_evalue, CutoffTable};
use crate::annotate::table::AnnotationTable;
use crate::kits::profile::ProfileDb;
use crate::kits::{DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::tools::traits::DomainHit;
use crate::Result;

pub const NAME: &str = "fegenie";
pub const FORMAL_NAME: &str = "FeGenie";
pub const CITATION: &str = "Garber AI, Nealson KH, Okamoto A, McAllister SM, Chan CS, Barco RA and \
     Merino N (2020) FeGenie: A Comprehensive Tool for the Identification of Iron Genes and Iron \
     Gene Neighborhoods in Genome and Metagenome Assemblies. Front. Microbiol. 11:37. \
     doi: 10.3389/fmicb.2020.00037";

const CUTOFF_COLUMN: &str = "soft_bitscore_cutoff";

/// Iron cycling HMMs, filtered by per-profile soft bit-score cutoffs
pub struct FegenieKit {
    db: ProfileDb,
    cutoffs: CutoffTable,
    settings: KitSettings,
}

pub fn build(ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    let hmm = ctx.config.require_path(NAME, "hmmdb")?;
    let cutoffs = CutoffTable::read_tsv(&ctx.config.require_path(NAME, "cutoffs")?)?;
    Ok(Box::new(FegenieKit {
        db: ProfileDb::new(&hmm, ctx)?,
        cutoffs,
        settings: KitSettings::new("hmm_style")
            .with_files(ctx.config.kit_entries(NAME))
            .with_param("score", "full")
            .with_param("cutoff", CUTOFF_COLUMN),
    }))
}

/// Hits whose full-sequence score beats their profile's soft cutoff
fn above_soft_cutoff(hits: Vec<DomainHit>, cutoffs: &CutoffTable) -> Vec<DomainHit> {
    hits.into_iter()
        .filter(|hit| match cutoffs.number(&hit.target_id, CUTOFF_COLUMN) {
            Some(cutoff) => hit.full_score > cutoff,
            None => false,
        })
        .collect()
}

impl DatabaseKit for FegenieKit {
    fn name(&self) -> &str {
        NAME
    }

    fn formal_name(&self) -> &str {
        FORMAL_NAME
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn max_threads(&self) -> Option<usize> {
        Some(2)
    }

    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        tracing::info!("Annotating {} with {}", batch.name, FORMAL_NAME);
        let hits = above_soft_cutoff(self.db.search(batch, ctx)?, &self.cutoffs);

        let id_col = format!("{}_id", NAME);
        let desc_col = format!("{}_description", NAME);
        if hits.is_empty() {
            return Ok(AnnotationTable::new());
        }
        let mut table = AnnotationTable::with_columns([&id_col, &desc_col]);
        for hit in top_hit_by_evalue(&hits) {
            table.set(&hit.query_id, &id_col, hit.target_id.as_str());
            table.set(&hit.query_id, &desc_col, hit.description.as_str());
        }
        Ok(table)
    }

    fn settings(&self) -> KitSettings {
        self.settings.clone()
    }
}
