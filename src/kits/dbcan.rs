use crate::annotate::batch::GeneBatch;
use crate::annotate::descriptions::{describe_column, DescriptionLookup, TsvDescriptions};
use crate::annotate::formatter::{group_by_query, join_unique, SignificanceFilter};
use crate::annotate::table::{AnnotationTable, ColumnCollision};
use crate::kits::profile::ProfileDb;
use crate::kits::{ids_in_cell, DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::tools::traits::DomainHit;
use crate::{AnnotError, Result};
use regex::Regex;
use std::cmp::Ordering;

pub const NAME: &str = "dbcan";
pub const FORMAL_NAME: &str = "dbCAN";
pub const CITATION: &str = "Y. Yin, X. Mao, J. Yang, X. Chen, F. Mao, and Y. Xu, \"dbcan: a web resource \
     for automated carbohydrate-active enzyme annotation,\" Nucleic acids research, vol. 40, no. W1, \
     pp. W445-W451, 2012.";

pub const MAX_EVALUE: f64 = 1e-18;

/// Carbohydrate-active enzyme families and subfamilies
pub struct DbcanKit {
    db: ProfileDb,
    filter: SignificanceFilter,
    descriptions: Option<TsvDescriptions>,
    family: Regex,
    settings: KitSettings,
}

pub fn build(ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    let hmm = ctx.config.require_path(NAME, "hmmdb")?;
    let descriptions = ctx
        .config
        .optional_path(NAME, "description_db")?
        .map(|path| TsvDescriptions::load(&path))
        .transpose()?;
    let filter = SignificanceFilter::default().with_max_evalue(MAX_EVALUE);
    Ok(Box::new(DbcanKit {
        db: ProfileDb::new(&hmm, ctx)?,
        filter,
        descriptions,
        family: Regex::new(r"^[A-Z]*[0-9]*").map_err(|e| AnnotError::Other(e.to_string()))?,
        settings: KitSettings::new("hmm_style")
            .with_files(ctx.config.kit_entries(NAME))
            .with_param("min_coverage", filter.min_coverage)
            .with_param("max_evalue", filter.max_evalue),
    }))
}

/// Profile names carry a `.hmm` suffix in the dbCAN release
fn family_id(target: &str) -> &str {
    target.strip_suffix(".hmm").unwrap_or(target)
}

/// Highest coverage wins, then lowest e-value; the earliest row wins full ties
fn best_hit<'a>(hits: &[&'a DomainHit]) -> Option<&'a DomainHit> {
    let mut best: Option<&DomainHit> = None;
    for &hit in hits {
        best = match best {
            None => Some(hit),
            Some(current) => {
                let better = match hit.coverage().partial_cmp(&current.coverage()) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => hit.full_evalue < current.full_evalue,
                    _ => false,
                };
                Some(if better { hit } else { current })
            }
        };
    }
    best
}

impl DbcanKit {
    fn lookup(&self) -> Option<&dyn DescriptionLookup> {
        self.descriptions.as_ref().map(|d| d as &dyn DescriptionLookup)
    }

    /// Family part of a subfamily id, e.g. `GH5` for `GH5_7`
    fn family_of<'a>(&self, id: &'a str) -> &'a str {
        self.family
            .find(id)
            .map(|m| m.as_str())
            .filter(|f| !f.is_empty())
            .unwrap_or(id)
    }
}

impl DatabaseKit for DbcanKit {
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
        let hits = self.filter.apply(self.db.search(batch, ctx)?);
        if hits.is_empty() {
            return Ok(AnnotationTable::new());
        }

        let ids_col = format!("{}_ids", NAME);
        let best_col = format!("{}_best_hit", NAME);
        let mut table = AnnotationTable::with_columns([&ids_col, &best_col]);
        for (query, group) in group_by_query(&hits) {
            table.set(
                query,
                &ids_col,
                join_unique(group.iter().map(|h| family_id(&h.target_id))),
            );
            if let Some(best) = best_hit(&group) {
                table.set(query, &best_col, family_id(&best.target_id));
            }
        }
        Ok(table)
    }

    /// `dbcan_hits` from family descriptions and `dbcan_subfam_ec` from subfamily EC numbers
    fn get_descriptions(&self, annotations: &AnnotationTable) -> Result<AnnotationTable> {
        let ids_col = format!("{}_ids", NAME);
        let mut families = AnnotationTable::with_columns([&ids_col]);
        for (row, ids) in annotations.values(&ids_col) {
            let family_ids = join_unique(ids.split("; ").map(|id| self.family_of(id)));
            families.set(row, &ids_col, family_ids);
        }

        let hits = describe_column(
            &families,
            &ids_col,
            &format!("{}_hits", NAME),
            self.lookup(),
            "description",
        )?;
        let subfam_ec = describe_column(
            annotations,
            &ids_col,
            &format!("{}_subfam_ec", NAME),
            self.lookup(),
            "ec",
        )?;
        hits.join(subfam_ec, ColumnCollision::Refuse)
    }

    fn get_ids(&self, annotations: &AnnotationTable, row: &str) -> Vec<String> {
        ids_in_cell(annotations, row, &format!("{}_ids", NAME), "; ")
    }

    fn settings(&self) -> KitSettings {
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{domain_hit, KitHarness};
    use pretty_assertions::assert_eq;

    fn hit(query: &str, target: &str, end: usize, evalue: f64) -> DomainHit {
        let mut hit = domain_hit(query, target);
        hit.target_start = 1;
        hit.target_end = end;
        hit.full_evalue = evalue;
        hit
    }

    #[test]
    fn test_family_id_strips_only_hmm_suffix() {
        assert_eq!(family_id("GH5_7.hmm"), "GH5_7");
        assert_eq!(family_id("GH5_1"), "GH5_1");
        assert_eq!(family_id("CBM10"), "CBM10");
    }

    #[test]
    fn test_best_hit_prefers_coverage_over_evalue() {
        let hits = vec![
            hit("g1", "GH5_7.hmm", 60, 1e-80),
            hit("g1", "CBM1.hmm", 90, 1e-20),
            hit("g1", "GH6.hmm", 90, 1e-40),
        ];
        let refs: Vec<&DomainHit> = hits.iter().collect();
        assert_eq!(best_hit(&refs).unwrap().target_id, "GH6.hmm");
    }

    #[test]
    fn test_search_and_describe() {
        let dir = tempfile::tempdir().unwrap();
        let harness = KitHarness::new(dir.path());
        let hmm = harness.touch("dbCAN-HMMdb-V11.txt");
        let descriptions = harness.write(
            "dbcan_descriptions.tsv",
            "id\tdescription\tec\nGH5\tCellulase\t\nGH5_7\t\t3.2.1.4\nCBM1\tCellulose-binding\t\n",
        );
        let harness = harness
            .with_file(NAME, "hmmdb", &hmm)
            .with_file(NAME, "description_db", &descriptions);
        let batch = harness.batch("A");
        harness.profile_hits(
            &batch.faa,
            &hmm,
            vec![
                hit("g1", "GH5_7.hmm", 90, 1e-40),
                hit("g1", "CBM1.hmm", 50, 1e-30),
                hit("g1", "GH5_7.hmm", 80, 1e-19),
                hit("g2", "GH5_7.hmm", 90, 1e-16),
                hit("g3", "CBM1.hmm", 20, 1e-50),
            ],
        );

        let kit = build(&harness.context()).unwrap();
        let table = kit.search(&batch, &harness.search_context("A")).unwrap();
        assert_eq!(table.row_ids().collect::<Vec<_>>(), vec!["g1"]);
        assert_eq!(table.get("g1", "dbcan_ids"), Some("GH5_7; CBM1"));
        assert_eq!(table.get("g1", "dbcan_best_hit"), Some("GH5_7"));
        assert_eq!(kit.get_ids(&table, "g1"), vec!["GH5_7", "CBM1"]);

        let described = kit.get_descriptions(&table).unwrap();
        assert_eq!(described.get("g1", "dbcan_hits"), Some("Cellulase; Cellulose-binding"));
        assert_eq!(described.get("g1", "dbcan_subfam_ec"), Some("3.2.1.4"));
    }

    #[test]
    fn test_descriptions_empty_without_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let harness = KitHarness::new(dir.path());
        let hmm = harness.touch("dbcan.hmm");
        let harness = harness.with_file(NAME, "hmmdb", &hmm);
        let kit = build(&harness.context()).unwrap();

        let mut table = AnnotationTable::new();
        table.set("A_g1", "dbcan_ids", "GH5_7");
        let described = kit.get_descriptions(&table).unwrap();
        assert_eq!(described.columns().collect::<Vec<_>>(), vec!["dbcan_hits", "dbcan_subfam_ec"]);
        assert_eq!(described.get("A_g1", "dbcan_hits"), None);
    }
}
