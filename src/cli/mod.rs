pub mod commands;
pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "annokit",
    version,
    about = "Annotate called genes against curated protein databases",
    long_about = "annokit searches gene batches against reference databases (MMseqs2 reciprocal \
                  best hits, HMMER profiles and simple motif counts) and merges every run into \
                  one annotation table per project."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available; default from config)
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// Kit configuration file (default: $ANNOKIT_CONFIG, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Project directory holding annotations.tsv and project_meta.json
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub project: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Annotate gene FASTAs and merge the results into the project
    Annotate(commands::annotate::AnnotateArgs),

    /// List the databases this build can annotate with
    ListDbs,

    /// List the named database sets
    ListDbSets,
}
