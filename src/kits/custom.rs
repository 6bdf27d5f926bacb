//! User-supplied databases named on the command line: protein FASTA files
//! searched by reciprocal best hit and profile HMM files.

use crate::annotate::batch::GeneBatch;
use crate::annotate::descriptions::{describe_column, HeaderDescriptions};
use crate::annotate::formatter::{sig_scores, top_hit_by_evalue, CutoffTable, SignificanceFilter};
use crate::annotate::table::AnnotationTable;
use crate::kits::blast_style::BlastStyleDb;
use crate::kits::profile::ProfileDb;
use crate::kits::{ids_in_cell, DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::{AnnotError, Result};
use std::path::{Path, PathBuf};

pub const CITATION: &str = "No citation for custom DBs";

/// A custom FASTA database: its kit name and the FASTA to index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFastaSpec {
    pub name: String,
    pub fasta: PathBuf,
}

/// A custom HMM database with an optional cutoffs/definitions table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHmmSpec {
    pub name: String,
    pub hmm: PathBuf,
    pub cutoffs: Option<PathBuf>,
}

/// Pair up names and locations given as repeated command line options
pub fn fasta_specs(names: &[String], locations: &[PathBuf]) -> Result<Vec<CustomFastaSpec>> {
    if names.len() != locations.len() {
        return Err(AnnotError::Usage(format!(
            "{} custom FASTA names were given for {} locations",
            names.len(),
            locations.len()
        )));
    }
    Ok(names
        .iter()
        .zip(locations)
        .map(|(name, fasta)| CustomFastaSpec {
            name: name.clone(),
            fasta: fasta.clone(),
        })
        .collect())
}

/// Like [`fasta_specs`]; cutoff files attach to the first HMMs in order
pub fn hmm_specs(names: &[String], locations: &[PathBuf], cutoffs: &[PathBuf]) -> Result<Vec<CustomHmmSpec>> {
    if names.len() != locations.len() {
        return Err(AnnotError::Usage(format!(
            "{} custom HMM names were given for {} locations",
            names.len(),
            locations.len()
        )));
    }
    if cutoffs.len() > names.len() {
        return Err(AnnotError::Usage(format!(
            "{} custom HMM cutoff files were given but only {} custom HMM databases",
            cutoffs.len(),
            names.len()
        )));
    }
    Ok(names
        .iter()
        .zip(locations)
        .enumerate()
        .map(|(i, (name, hmm))| CustomHmmSpec {
            name: name.clone(),
            hmm: hmm.clone(),
            cutoffs: cutoffs.get(i).cloned(),
        })
        .collect())
}

fn require_file(name: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AnnotError::Configuration(format!(
            "custom database {} points at {}, which does not exist",
            name,
            path.display()
        )))
    }
}

/// Reciprocal best hits against a user FASTA, described by its headers
pub struct CustomFastaKit {
    name: String,
    fasta: PathBuf,
    db: BlastStyleDb,
    headers: HeaderDescriptions,
}

impl CustomFastaKit {
    /// Index the FASTA under the run working directory
    pub fn build(spec: &CustomFastaSpec, ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
        require_file(&spec.name, &spec.fasta)?;
        let index_path = ctx
            .kit_dir(&spec.name)
            .join(format!("{}.mmsdb", spec.name));
        tracing::info!("Indexing custom FASTA database {}", spec.name);
        let index = ctx
            .search
            .create_index(&spec.fasta, &index_path, ctx.settings.threads)?;
        Ok(Box::new(Self {
            name: spec.name.clone(),
            fasta: spec.fasta.clone(),
            db: BlastStyleDb::new(&spec.name, index.path(), ctx),
            headers: HeaderDescriptions::from_fasta(&spec.fasta)?,
        }))
    }
}

impl DatabaseKit for CustomFastaKit {
    fn name(&self) -> &str {
        &self.name
    }

    fn formal_name(&self) -> &str {
        &self.name
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        self.db.search(batch, ctx)
    }

    /// `<name>_description` is the full FASTA header of the hit
    fn get_descriptions(&self, annotations: &AnnotationTable) -> Result<AnnotationTable> {
        describe_column(
            annotations,
            &format!("{}_hit", self.name),
            &format!("{}_description", self.name),
            Some(&self.headers),
            "description",
        )
    }

    fn get_ids(&self, annotations: &AnnotationTable, row: &str) -> Vec<String> {
        ids_in_cell(annotations, row, &format!("{}_hit", self.name), "; ")
    }

    fn settings(&self) -> KitSettings {
        let (bit, rbh) = self.db.thresholds();
        KitSettings::new("blast_style")
            .with_param("db_type", "custom_fasta")
            .with_param("input_fasta", self.fasta.display())
            .with_param("bit_score_threshold", bit)
            .with_param("rbh_bit_score_threshold", rbh)
    }
}

/// Top profile hit per gene against a user HMM file
pub struct CustomHmmKit {
    name: String,
    db: ProfileDb,
    cutoffs: Option<CutoffTable>,
    cutoffs_path: Option<PathBuf>,
}

impl CustomHmmKit {
    /// Press the profiles and read the cutoffs table, if any
    pub fn build(spec: &CustomHmmSpec, ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
        require_file(&spec.name, &spec.hmm)?;
        tracing::info!("Pre-processing custom HMM database {}", spec.name);
        let cutoffs = match &spec.cutoffs {
            Some(path) => {
                require_file(&spec.name, path)?;
                Some(CutoffTable::read_tsv(path)?)
            }
            None => None,
        };
        Ok(Box::new(Self {
            name: spec.name.clone(),
            db: ProfileDb::new(&spec.hmm, ctx)?,
            cutoffs,
            cutoffs_path: spec.cutoffs.clone(),
        }))
    }
}

impl DatabaseKit for CustomHmmKit {
    fn name(&self) -> &str {
        &self.name
    }

    fn formal_name(&self) -> &str {
        &self.name
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn max_threads(&self) -> Option<usize> {
        Some(2)
    }

    /// `<name>_id`, plus `<name>_hits` definitions when a cutoffs table was given
    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        tracing::info!("Annotating {} with custom HMM database {}", batch.name, self.name);
        let hits = self.db.search(batch, ctx)?;
        let hits = match &self.cutoffs {
            Some(cutoffs) => sig_scores(hits, cutoffs)?,
            None => SignificanceFilter::default().apply(hits),
        };
        if hits.is_empty() {
            return Ok(AnnotationTable::new());
        }

        let id_col = format!("{}_id", self.name);
        let hits_col = format!("{}_hits", self.name);
        let mut table = AnnotationTable::with_columns([&id_col]);
        if self.cutoffs.is_some() {
            table.add_column(&hits_col);
        }
        for hit in top_hit_by_evalue(&hits) {
            table.set(&hit.query_id, &id_col, hit.target_id.as_str());
            if let Some(cutoffs) = &self.cutoffs {
                table.set_cell(
                    &hit.query_id,
                    &hits_col,
                    cutoffs.definition(&hit.target_id).map(str::to_string),
                );
            }
        }
        Ok(table)
    }

    fn settings(&self) -> KitSettings {
        let mut settings = KitSettings::new("hmm_style")
            .with_param("db_type", "custom_hmm")
            .with_param("input_hmm", self.db.hmm().display());
        if let Some(path) = &self.cutoffs_path {
            settings = settings.with_param("cutoffs", path.display());
        }
        settings
    }
}
