use crate::annotate::batch::GeneBatch;
use crate::annotate::formatter::{sig_scores, top_hit_by_evalue, CutoffTable, SignificanceFilter};
use crate::annotate::table::AnnotationTable;
use crate::kits::profile::ProfileDb;
use crate::kits::{DatabaseKit, KitContext, KitSettings, SearchContext};
use crate::tools::traits::DomainHit;
use crate::Result;

pub const NAME: &str = "kofam";
pub const FORMAL_NAME: &str = "KOfam";
pub const CITATION: &str = "T. Aramaki, R. Blanc-Mathieu, H. Endo, K. Ohkubo, M. Kanehisa, S. Goto, \
     and H. Ogata, \"Kofamkoala: Kegg ortholog assignment based on profile hmm and adaptive score \
     threshold,\" Bioinformatics, vol. 36, no. 7, pp. 2251-2252, 2020.";

/// How KOfam hits are judged significant
#[derive(Debug, Clone, Copy, PartialEq)]
enum Significance {
    /// Per-KO adaptive thresholds from `ko_list`
    KoList,
    /// The coverage and e-value rule used for dbCAN
    Generic(SignificanceFilter),
}

/// KEGG orthologs from the KOfam profile collection
pub struct KofamKit {
    db: ProfileDb,
    ko_list: CutoffTable,
    significance: Significance,
    settings: KitSettings,
}

pub fn build(ctx: &KitContext) -> Result<Box<dyn DatabaseKit>> {
    let hmm = ctx.config.require_path(NAME, "hmm")?;
    let ko_list = CutoffTable::read_tsv(&ctx.config.require_path(NAME, "ko_list")?)?;
    let significance = if ctx.settings.kofam_use_dbcan2_thresholds {
        tracing::info!("Judging {} hits by coverage and e-value instead of ko_list thresholds", FORMAL_NAME);
        Significance::Generic(SignificanceFilter::default())
    } else {
        Significance::KoList
    };
    Ok(Box::new(KofamKit {
        db: ProfileDb::new(&hmm, ctx)?,
        ko_list,
        significance,
        settings: KitSettings::new("hmm_style")
            .with_files(ctx.config.kit_entries(NAME))
            .with_param("use_dbcan2_thresholds", ctx.settings.kofam_use_dbcan2_thresholds),
    }))
}

impl KofamKit {
    fn significant(&self, hits: Vec<DomainHit>) -> Result<Vec<DomainHit>> {
        match self.significance {
            Significance::KoList => sig_scores(hits, &self.ko_list),
            Significance::Generic(filter) => Ok(filter.apply(hits)),
        }
    }
}

impl DatabaseKit for KofamKit {
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

    /// `kofam_id` is the best KO by e-value, `kofam_hit` its ko_list definition
    fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
        tracing::info!("Annotating {} with {}", batch.name, FORMAL_NAME);
        let hits = self.significant(self.db.search(batch, ctx)?)?;
        if hits.is_empty() {
            return Ok(AnnotationTable::new());
        }

        let id_col = format!("{}_id", NAME);
        let hit_col = format!("{}_hit", NAME);
        let mut table = AnnotationTable::with_columns([&id_col, &hit_col]);
        for hit in top_hit_by_evalue(&hits) {
            table.set(&hit.query_id, &id_col, hit.target_id.as_str());
            table.set_cell(
                &hit.query_id,
                &hit_col,
                self.ko_list.definition(&hit.target_id).map(str::to_string),
            );
        }
        Ok(table)
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

    const KO_LIST: &str = "knum\tthreshold\tscore_type\tprofile_type\tF-measure\tnseq\tnseq_used\talen\tmlen\teff_nseq\tre/pos\tdefinition\n\
        K00001\t300.0\tfull\tall\t0.9\t100\t90\t400\t380\t10\t0.5\talcohol dehydrogenase [EC:1.1.1.1]\n\
        K00002\t100.0\tdomain\tall\t0.9\t100\t90\t400\t380\t10\t0.5\talcohol dehydrogenase (NADP+)\n\
        K00003\t-\t-\tall\t0.9\t100\t90\t400\t380\t10\t0.5\thomoserine dehydrogenase\n";

    fn harness(root: &std::path::Path) -> (KitHarness, std::path::PathBuf) {
        let harness = KitHarness::new(root);
        let hmm = harness.touch("kofam_profiles.hmm");
        let ko_list = harness.write("kofam_ko_list.tsv", KO_LIST);
        let harness = harness
            .with_file(NAME, "hmm", &hmm)
            .with_file(NAME, "ko_list", &ko_list);
        (harness, hmm)
    }

    fn hits() -> Vec<DomainHit> {
        let mut strong = domain_hit("g1", "K00001");
        strong.full_score = 350.0;
        strong.full_evalue = 1e-90;
        let mut second = domain_hit("g1", "K00002");
        second.domain_score = 150.0;
        second.full_evalue = 1e-40;
        let mut weak = domain_hit("g2", "K00001");
        weak.full_score = 120.0;
        weak.full_evalue = 1e-30;
        let uncalibrated = domain_hit("g3", "K00003");
        vec![strong, second, weak, uncalibrated]
    }

    #[test]
    fn test_ko_list_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let (harness, hmm) = harness(dir.path());
        let batch = harness.batch("A");
        harness.profile_hits(&batch.faa, &hmm, hits());

        let kit = build(&harness.context()).unwrap();
        let table = kit.search(&batch, &harness.search_context("A")).unwrap();
        assert_eq!(table.row_ids().collect::<Vec<_>>(), vec!["g1"]);
        assert_eq!(table.get("g1", "kofam_id"), Some("K00001"));
        assert_eq!(table.get("g1", "kofam_hit"), Some("alcohol dehydrogenase [EC:1.1.1.1]"));
    }

    #[test]
    fn test_dbcan2_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let (harness, hmm) = harness(dir.path());
        let harness = harness.with_settings(|s| s.kofam_use_dbcan2_thresholds = true);
        let batch = harness.batch("A");
        harness.profile_hits(&batch.faa, &hmm, hits());

        let kit = build(&harness.context()).unwrap();
        let table = kit.search(&batch, &harness.search_context("A")).unwrap();
        assert_eq!(table.row_ids().collect::<Vec<_>>(), vec!["g1", "g2", "g3"]);
        assert_eq!(table.get("g3", "kofam_id"), Some("K00003"));
        assert_eq!(kit.settings().params["use_dbcan2_thresholds"], "true");
    }
}
