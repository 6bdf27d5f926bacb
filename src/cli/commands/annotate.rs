use crate::annotate::pipeline::{annotate_project, AnnotateRequest};
use crate::cli::formatter::{format_count, print_success, print_summary, print_tip, print_warning};
use crate::core::config::KitsConfig;
use crate::kits::custom::{fasta_specs, hmm_specs};
use crate::kits::KitRegistry;
use crate::tools::SearchTools;
use crate::utils::parallel::effective_threads;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Called-gene protein FASTAs to add to the project (one batch per file)
    #[arg(value_name = "GENE_FAA")]
    pub genes: Vec<PathBuf>,

    /// Database to annotate with (repeatable; see list-dbs)
    #[arg(long = "use-db", value_name = "DB")]
    pub use_db: Vec<String>,

    /// Named set of databases (repeatable; see list-db-sets)
    #[arg(long = "use-dbset", value_name = "SET")]
    pub use_dbset: Vec<String>,

    /// Minimum bit score for a forward hit (default from config, else 60)
    #[arg(long)]
    pub bit_score_threshold: Option<f64>,

    /// Minimum bit score for a reverse hit (default from config, else 350)
    #[arg(long)]
    pub rbh_bit_score_threshold: Option<f64>,

    /// Name of a custom FASTA database (pairs with --custom-fasta-db-loc)
    #[arg(long, value_name = "NAME")]
    pub custom_fasta_db_name: Vec<String>,

    /// Location of a custom FASTA database
    #[arg(long, value_name = "PATH")]
    pub custom_fasta_db_loc: Vec<PathBuf>,

    /// Name of a custom HMM database (pairs with --custom-hmm-db-loc)
    #[arg(long, value_name = "NAME")]
    pub custom_hmm_db_name: Vec<String>,

    /// Location of a custom HMM database
    #[arg(long, value_name = "PATH")]
    pub custom_hmm_db_loc: Vec<PathBuf>,

    /// Cutoffs and definitions table for a custom HMM database, in name order
    #[arg(long, value_name = "PATH")]
    pub custom_hmm_db_cutoffs_loc: Vec<PathBuf>,

    /// Use the generic e-value/coverage filter for KOfam instead of ko_list thresholds
    #[arg(long)]
    pub kofam_use_dbcan2_thresholds: bool,

    /// Working directory for intermediate files (default: a run directory in the project)
    #[arg(long, value_name = "PATH")]
    pub tmp_dir: Option<PathBuf>,

    /// Keep intermediate files after the run
    #[arg(long)]
    pub keep_tmp: bool,

    /// Re-annotate with databases already used and overwrite their columns
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(args: AnnotateArgs, project: &Path, config: &KitsConfig, threads: Option<usize>) -> anyhow::Result<()> {
    let mut settings = config.annotate.clone();
    if let Some(threads) = threads {
        settings.threads = effective_threads(threads);
    }
    if let Some(bit) = args.bit_score_threshold {
        settings.bit_score_threshold = bit;
    }
    if let Some(rbh) = args.rbh_bit_score_threshold {
        settings.rbh_bit_score_threshold = rbh;
    }
    settings.kofam_use_dbcan2_thresholds |= args.kofam_use_dbcan2_thresholds;
    settings.keep_tmp |= args.keep_tmp;
    settings.force |= args.force;

    let request = AnnotateRequest {
        project_dir: project.to_path_buf(),
        gene_fastas: args.genes,
        use_db: args.use_db,
        use_dbset: args.use_dbset,
        custom_fasta: fasta_specs(&args.custom_fasta_db_name, &args.custom_fasta_db_loc)?,
        custom_hmm: hmm_specs(
            &args.custom_hmm_db_name,
            &args.custom_hmm_db_loc,
            &args.custom_hmm_db_cutoffs_loc,
        )?,
        settings,
        tmp_dir: args.tmp_dir,
        show_progress: true,
    };

    std::fs::create_dir_all(project)?;
    let tools = SearchTools::system();
    tools.search.verify_installation()?;

    let outcome = annotate_project(&request, config, &KitRegistry::builtin(), &tools)?;

    print_success(&format!(
        "Annotated {} genes into {}",
        format_count(outcome.rows),
        outcome.annotations_path.display()
    ));
    let mut items = vec![
        ("Run", outcome.run.run_id.clone()),
        (
            "Databases",
            outcome.run.used_dbs.iter().cloned().collect::<Vec<_>>().join(", "),
        ),
    ];
    if let Some(report) = &outcome.merge {
        items.push(("Updated genes", format_count(report.colliding_rows)));
        items.push(("Carried over", format_count(report.carried_rows)));
        if !report.overwritten_columns.is_empty() {
            items.push(("Overwritten", report.overwritten_columns.join(", ")));
        }
        if report.row_count_mismatch {
            print_warning("the merged table has an unexpected number of rows; check it before relying on it");
        }
    }
    print_summary("Summary", &items);
    if request.settings.keep_tmp {
        print_tip(&format!(
            "Intermediate files were kept in {}",
            request.project_dir.join(&outcome.run.working_dir).display()
        ));
    }
    Ok(())
}
