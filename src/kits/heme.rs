use crate::annotate::batch::GeneBatch;
use crate::annotate::table::AnnotationTable;
use crate::bio::fasta::parse_fasta;
use crate::kits::{DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::{AnnotError, Result};
use regex::Regex;

pub const NAME: &str = "heme";
pub const FORMAL_NAME: &str = "Heme Regulatory Motifs Counts";
pub const CITATION: &str = "This database is so simple \"(C..CH)\" it does not warrant a citation.";
pub const MOTIF: &str = "(C..CH)";
pub const COUNT_COLUMN: &str = "heme_regulatory_motif_count";

/// Counts heme regulatory motifs in every gene; runs no external tool
pub struct HemeKit {
    motif: Regex,
}

pub fn build(_ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    Ok(Box::new(HemeKit::new()?))
}

impl HemeKit {
    pub fn new() -> Result<Self> {
        Ok(Self {
            motif: Regex::new(MOTIF).map_err(|e| AnnotError::Other(e.to_string()))?,
        })
    }

    /// Non-overlapping motif matches in one protein
    pub fn count(&self, residues: &str) -> usize {
        self.motif.find_iter(residues).count()
    }
}

impl DatabaseKit for HemeKit {
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
        Some(1)
    }

    fn can_get_ids(&self) -> bool {
        false
    }

    /// One row per gene in the batch, zero counts included
    fn search(&self, batch: &GeneBatch, _ctx: &SearchContext) -> Result<AnnotationTable> {
        let mut table = AnnotationTable::with_columns([COUNT_COLUMN]);
        for seq in parse_fasta(&batch.faa)? {
            table.set(&seq.id, COUNT_COLUMN, self.count(&seq.residues()).to_string());
        }
        Ok(table)
    }

    fn get_ids(&self, _annotations: &AnnotationTable, _row: &str) -> Vec<String> {
        Vec::new()
    }

    fn settings(&self) -> KitSettings {
        KitSettings::new("motif_count").with_param("motif", MOTIF)
    }
}
