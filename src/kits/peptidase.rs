use crate::annotate::batch::GeneBatch;
use crate::annotate::descriptions::{lookup_descriptions, TsvDescriptions};
use crate::annotate::table::AnnotationTable;
use crate::kits::blast_style::BlastStyleDb;
use crate::kits::{ids_in_cell, DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::{AnnotError, Result};
use regex::Regex;
use std::collections::HashMap;

pub const NAME: &str = "peptidase";
pub const FORMAL_NAME: &str = "Peptidase";
pub const CITATION: &str = "N. D. Rawlings, A. J. Barrett, P. D. Thomas, X. Huang, A. Bateman, and \
     R. D. Finn, \"The merops database of proteolytic enzymes, their substrates and inhibitors in \
     2017 and a comparison with peptidases in the panther database,\" Nucleic acids research, \
     vol. 46, no. D1, pp. D624-D632, 2018.";

/// MEROPS peptidases, searched by reciprocal best hit
pub struct PeptidaseKit {
    db: BlastStyleDb,
    descriptions: Option<TsvDescriptions>,
    family: Regex,
    settings: KitSettings,
}

pub fn build(ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    let mmsdb = ctx.config.require_path(NAME, "mmsdb")?;
    let descriptions = ctx
        .config
        .optional_path(NAME, "description_db")?
        .map(|path| TsvDescriptions::load(&path))
        .transpose()?;
    if descriptions.is_none() {
        tracing::warn!("No peptidase description_db configured, descriptions will be empty");
    }
    let family = Regex::new(r"#\w*.#").map_err(|e| AnnotError::Other(e.to_string()))?;
    let db = BlastStyleDb::new(NAME, &mmsdb, ctx);
    let (bit, rbh) = db.thresholds();

    Ok(Box::new(PeptidaseKit {
        db,
        descriptions,
        family,
        settings: KitSettings::new("blast_style")
            .with_files(ctx.config.kit_entries(NAME))
            .with_param("bit_score_threshold", bit)
            .with_param("rbh_bit_score_threshold", rbh),
    }))
}

impl PeptidaseKit {
    /// Family code between the `#` marks of a MEROPS header, e.g. `S08A`
    fn family_of(&self, description: &str) -> Option<String> {
        self.family
            .find(description)
            .map(|m| m.as_str().trim_matches('#').to_string())
    }
}

impl DatabaseKit for PeptidaseKit {
    fn name(&self) -> &str {
        NAME
    }

    fn formal_name(&self) -> &str {
        FORMAL_NAME
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        self.db.search(batch, ctx)
    }

    /// `peptidase_id`, `peptidase_description` and `peptidase_family` for every gene with a hit
    fn get_descriptions(&self, annotations: &AnnotationTable) -> Result<AnnotationTable> {
        let id_col = format!("{}_id", NAME);
        let desc_col = format!("{}_description", NAME);
        let family_col = format!("{}_family", NAME);
        let mut described = AnnotationTable::with_columns([&id_col, &desc_col, &family_col]);

        let hits = annotations.values(&format!("{}_hit", NAME));
        let found = match &self.descriptions {
            Some(lookup) => lookup_descriptions(lookup, hits.iter().map(|(_, hit)| *hit), "description")?,
            None => HashMap::new(),
        };

        for (row, hit) in hits {
            described.set(row, &id_col, hit);
            if let Some(description) = found.get(hit) {
                described.set(row, &desc_col, description.as_str());
                described.set_cell(row, &family_col, self.family_of(description));
            }
        }
        Ok(described)
    }

    fn get_ids(&self, annotations: &AnnotationTable, row: &str) -> Vec<String> {
        ids_in_cell(annotations, row, &format!("{}_family", NAME), ";")
    }

    fn settings(&self) -> KitSettings {
        self.settings.clone()
    }
}
