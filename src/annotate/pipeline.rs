//! One annotation run over a project: batches in, `annotations.tsv` and
//! `project_meta.json` out.

use crate::annotate::batch::{check_unique_names, GeneBatch};
use crate::annotate::merge::{check_reannotation, merge_past_annotations, MergeReport};
use crate::annotate::orchestrator::{SearchOrchestrator, ThreadPlan};
use crate::annotate::table::AnnotationTable;
use crate::core::config::{AnnotateSettings, KitsConfig};
use crate::core::paths::{relative_to, run_id, ANNOTATIONS_TSV};
use crate::core::project::{ProjectMeta, RunMetadata};
use crate::kits::custom::{CustomFastaKit, CustomFastaSpec, CustomHmmKit, CustomHmmSpec};
use crate::kits::sets::expand_selection;
use crate::kits::{DatabaseKit, KitContext, KitRegistry};
use crate::tools::SearchTools;
use crate::{AnnotError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Everything one `annotate` invocation asks for
#[derive(Debug, Clone, Default)]
pub struct AnnotateRequest {
    pub project_dir: PathBuf,
    /// Called-gene protein FASTAs not yet registered with the project
    pub gene_fastas: Vec<PathBuf>,
    pub use_db: Vec<String>,
    pub use_dbset: Vec<String>,
    pub custom_fasta: Vec<CustomFastaSpec>,
    pub custom_hmm: Vec<CustomHmmSpec>,
    pub settings: AnnotateSettings,
    /// Working directory for intermediate files; defaults to `<project>/<run_id>`
    pub tmp_dir: Option<PathBuf>,
    pub show_progress: bool,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct AnnotateOutcome {
    pub run: RunMetadata,
    pub annotations_path: PathBuf,
    pub rows: usize,
    /// Present when the run was merged onto earlier annotations
    pub merge: Option<MergeReport>,
}

/// Annotate a project's gene batches and merge the result onto its past annotations.
///
/// Nothing in the project directory changes unless every search succeeds.
pub fn annotate_project(
    request: &AnnotateRequest,
    config: &KitsConfig,
    registry: &KitRegistry,
    tools: &SearchTools,
) -> Result<AnnotateOutcome> {
    let project_dir = request.project_dir.as_path();
    let settings = &request.settings;
    let force = settings.force;

    let mut meta = ProjectMeta::load(project_dir)?;
    let baseline = meta.latest_run().cloned();

    let mut batches = collect_batches(project_dir, &meta, &request.gene_fastas)?;
    let batch_names: Vec<String> = batches.iter().map(|b| b.name.clone()).collect();

    let selection = expand_selection(registry, &request.use_db, &request.use_dbset)?;
    if selection.is_empty() && request.custom_fasta.is_empty() && request.custom_hmm.is_empty() {
        return Err(AnnotError::Usage(
            "no databases selected; pass --use-db, --use-dbset or a custom database".to_string(),
        ));
    }
    let mut requested = selection.clone();
    requested.extend(request.custom_fasta.iter().map(|c| c.name.clone()));
    requested.extend(request.custom_hmm.iter().map(|c| c.name.clone()));
    check_reannotation(baseline.as_ref(), &requested, &batch_names, force)?;

    let run_id = run_id("annotations");
    let working_dir = request
        .tmp_dir
        .clone()
        .unwrap_or_else(|| project_dir.join(&run_id));
    std::fs::create_dir_all(&working_dir)?;
    tracing::info!(
        "Annotating {} gene batches with {} databases, working in {}",
        batches.len(),
        requested.len(),
        working_dir.display()
    );

    let ctx = KitContext {
        config,
        settings,
        search: tools.search.clone(),
        profile: tools.profile.clone(),
        working_dir: &working_dir,
    };
    let kits = build_kits(registry, &selection, request, &ctx)?;

    let plan = ThreadPlan::new(settings.threads, batches.len());
    tracing::debug!("Thread plan: {:?}", plan);
    let orchestrator = SearchOrchestrator::new(&kits, &working_dir, plan)
        .with_force(force)
        .with_progress(request.show_progress);

    orchestrator.build_indexes(&mut batches, tools.search.as_ref())?;
    let annotations = orchestrator.run(&batches)?;
    let annotations = orchestrator.describe(annotations)?;

    let (annotations, merge) = match past_annotations(project_dir, &meta, force)? {
        Some(past) => {
            tracing::info!("Merging with {} previously annotated genes", past.len());
            let (merged, report) = merge_past_annotations(annotations, past, force)?;
            (merged, Some(report))
        }
        None => (annotations, None),
    };

    let annotations_path = project_dir.join(ANNOTATIONS_TSV);
    annotations.write_tsv(&annotations_path)?;

    for batch in &batches {
        meta.register_batch(batch.to_record(project_dir))?;
    }
    let run = RunMetadata {
        run_id: run_id.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: chrono::Utc::now(),
        annotations_tsv: PathBuf::from(ANNOTATIONS_TSV),
        working_dir: relative_to(project_dir, &working_dir),
        used_dbs: kits.iter().map(|k| k.name().to_string()).collect(),
        batch_names: batch_names.into_iter().collect::<BTreeSet<_>>(),
        settings: settings.clone(),
        kit_settings: kits
            .iter()
            .map(|k| (k.name().to_string(), k.settings()))
            .collect::<BTreeMap<_, _>>(),
    };
    meta.record_run(run);
    meta.save(project_dir)?;

    if !settings.keep_tmp {
        if let Err(e) = std::fs::remove_dir_all(&working_dir) {
            tracing::warn!("Could not remove working directory {}: {}", working_dir.display(), e);
        }
    }

    let run = meta
        .latest_run()
        .cloned()
        .ok_or_else(|| AnnotError::Other(format!("run {} was not recorded", run_id)))?;
    tracing::info!(
        "Wrote {} annotated genes to {}",
        annotations.len(),
        annotations_path.display()
    );
    Ok(AnnotateOutcome {
        run,
        annotations_path,
        rows: annotations.len(),
        merge,
    })
}

/// Newly supplied FASTAs followed by every batch the project already knows
fn collect_batches(project_dir: &Path, meta: &ProjectMeta, gene_fastas: &[PathBuf]) -> Result<Vec<GeneBatch>> {
    let mut batches = Vec::with_capacity(gene_fastas.len() + meta.batches.len());
    for faa in gene_fastas {
        if !faa.is_file() {
            return Err(AnnotError::Usage(format!(
                "gene FASTA {} does not exist",
                faa.display()
            )));
        }
        batches.push(GeneBatch::for_fasta(project_dir, faa)?);
    }
    batches.extend(meta.batches.iter().map(|record| GeneBatch::from_record(project_dir, record)));

    if batches.is_empty() {
        return Err(AnnotError::Usage(
            "no gene FASTAs given and the project has no registered gene batches".to_string(),
        ));
    }
    check_unique_names(&batches)?;
    Ok(batches)
}

fn build_kits(
    registry: &KitRegistry,
    selection: &[String],
    request: &AnnotateRequest,
    ctx: &KitContext,
) -> Result<Vec<Box<dyn DatabaseKit>>> {
    let mut kits = registry.build(selection, ctx)?;
    for spec in &request.custom_fasta {
        kits.push(CustomFastaKit::build(spec, ctx)?);
    }
    for spec in &request.custom_hmm {
        kits.push(CustomHmmKit::build(spec, ctx)?);
    }
    Ok(kits)
}

/// The latest run's table, or under force an unrecorded `annotations.tsv`
fn past_annotations(project_dir: &Path, meta: &ProjectMeta, force: bool) -> Result<Option<AnnotationTable>> {
    if let Some(path) = meta.latest_annotations(project_dir)? {
        return AnnotationTable::read_tsv(&path).map(Some);
    }
    let loose = project_dir.join(ANNOTATIONS_TSV);
    if loose.is_file() {
        if !force {
            return Err(AnnotError::Usage(format!(
                "{} exists but no run is recorded for it; use the force flag (-f) to merge onto it",
                loose.display()
            )));
        }
        tracing::warn!("Merging onto unrecorded annotations at {}", loose.display());
        return AnnotationTable::read_tsv(&loose).map(Some);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{FASTA_COL, GENE_ID_COL};
    use crate::kits::heme;
    use crate::testing::{MockProfileSearch, MockSearch};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const GENES: &str = ">g1\nMCAACHK\n>g2\nMKKK\n>g3\nCAACHCGGCH\n";

    struct Fixture {
        dir: tempfile::TempDir,
        search: Arc<MockSearch>,
        tools: SearchTools,
    }

    impl Fixture {
        fn new() -> Self {
            let search = Arc::new(MockSearch::new());
            let tools = SearchTools::new(search.clone(), Arc::new(MockProfileSearch::new()));
            Self {
                dir: tempfile::tempdir().unwrap(),
                search,
                tools,
            }
        }

        fn project(&self) -> PathBuf {
            self.dir.path().join("project")
        }

        fn fasta(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(format!("{}.faa", name));
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn request(&self, fastas: Vec<PathBuf>, dbs: &[&str]) -> AnnotateRequest {
            AnnotateRequest {
                project_dir: self.project(),
                gene_fastas: fastas,
                use_db: dbs.iter().map(|d| d.to_string()).collect(),
                settings: AnnotateSettings {
                    threads: 2,
                    ..AnnotateSettings::default()
                },
                ..AnnotateRequest::default()
            }
        }

        fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateOutcome> {
            annotate_project(request, &KitsConfig::default(), &KitRegistry::builtin(), &self.tools)
        }
    }

    #[test]
    fn test_first_run_writes_table_and_metadata() {
        let fx = Fixture::new();
        let fasta = fx.fasta("A", GENES);
        let outcome = fx.annotate(&fx.request(vec![fasta], &[heme::NAME])).unwrap();

        assert_eq!(outcome.rows, 3);
        assert!(outcome.merge.is_none());
        let table = AnnotationTable::read_tsv(&outcome.annotations_path).unwrap();
        assert_eq!(table.row_ids().collect::<Vec<_>>(), vec!["A_g1", "A_g2", "A_g3"]);
        assert_eq!(table.get("A_g3", FASTA_COL), Some("A"));
        assert_eq!(table.get("A_g3", GENE_ID_COL), Some("g3"));
        assert_eq!(table.get("A_g3", heme::COUNT_COLUMN), Some("2"));

        let meta = ProjectMeta::load(&fx.project()).unwrap();
        let run = meta.latest_run().unwrap();
        assert_eq!(run.used_dbs.iter().collect::<Vec<_>>(), vec!["heme"]);
        assert!(run.kit_settings.contains_key("heme"));
        assert_eq!(meta.batches.len(), 1);
        assert!(!fx.project().join(&run.working_dir).exists());
        assert_eq!(fx.search.index_builds().len(), 1);
    }

    #[test]
    fn test_empty_selection_is_usage_error() {
        let fx = Fixture::new();
        let fasta = fx.fasta("A", GENES);
        let err = fx.annotate(&fx.request(vec![fasta], &[])).unwrap_err();
        assert!(matches!(err, AnnotError::Usage(_)));
        assert!(!fx.project().join(ANNOTATIONS_TSV).exists());
    }

    #[test]
    fn test_no_batches_is_usage_error() {
        let fx = Fixture::new();
        let err = fx.annotate(&fx.request(vec![], &[heme::NAME])).unwrap_err();
        assert!(matches!(err, AnnotError::Usage(_)));
    }

    #[test]
    fn test_second_run_merges_recorded_batches() {
        let fx = Fixture::new();
        let a = fx.fasta("A", GENES);
        fx.annotate(&fx.request(vec![a], &[heme::NAME])).unwrap();

        // Same database again needs force
        let b = fx.fasta("B", ">h1\nCAACH\n");
        let err = fx.annotate(&fx.request(vec![b.clone()], &[heme::NAME])).unwrap_err();
        assert!(matches!(err, AnnotError::Usage(_)));

        let mut forced = fx.request(vec![b], &[heme::NAME]);
        forced.settings.force = true;
        let outcome = fx.annotate(&forced).unwrap();
        assert_eq!(outcome.rows, 4);
        let report = outcome.merge.unwrap();
        assert_eq!(report.colliding_rows, 3);
        assert!(report.overwritten_columns.contains(&heme::COUNT_COLUMN.to_string()));

        let meta = ProjectMeta::load(&fx.project()).unwrap();
        assert_eq!(meta.batches.len(), 2);
        assert!(meta.latest_run().unwrap().batch_names.contains("B"));
    }

    #[test]
    fn test_duplicate_batch_name_is_rejected_before_writing() {
        let fx = Fixture::new();
        let a = fx.fasta("A", GENES);
        fx.annotate(&fx.request(vec![a], &[heme::NAME])).unwrap();
        let before = std::fs::read_to_string(fx.project().join(ANNOTATIONS_TSV)).unwrap();

        let other_dir = fx.dir.path().join("elsewhere");
        std::fs::create_dir_all(&other_dir).unwrap();
        let clash = other_dir.join("A.faa");
        std::fs::write(&clash, GENES).unwrap();
        let mut request = fx.request(vec![clash], &[heme::NAME]);
        request.settings.force = true;
        let err = fx.annotate(&request).unwrap_err();
        assert!(matches!(err, AnnotError::Usage(_)));
        assert_eq!(std::fs::read_to_string(fx.project().join(ANNOTATIONS_TSV)).unwrap(), before);
    }

    #[test]
    fn test_keep_tmp_leaves_working_dir() {
        let fx = Fixture::new();
        let fasta = fx.fasta("A", GENES);
        let mut request = fx.request(vec![fasta], &[heme::NAME]);
        request.settings.keep_tmp = true;
        request.tmp_dir = Some(fx.dir.path().join("scratch"));
        let outcome = fx.annotate(&request).unwrap();
        assert!(fx.dir.path().join("scratch").is_dir());
        assert_eq!(outcome.run.working_dir, fx.dir.path().join("scratch"));
    }
}
