use annokit::cli::{commands, formatter, Cli, Commands};
use annokit::core::config::KitsConfig;
use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // ANNOKIT_LOG sets the level; each -v raises it
    let log_level = match cli.verbose {
        0 => std::env::var("ANNOKIT_LOG").unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    formatter::init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = e
            .downcast_ref::<annokit::AnnotError>()
            .map(annokit::AnnotError::exit_code)
            .unwrap_or(1);
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(threads) = cli.threads {
        annokit::utils::parallel::configure_thread_pool(threads)?;
        if cli.verbose > 0 {
            eprintln!(
                "Using {} threads",
                annokit::utils::parallel::effective_threads(threads)
            );
        }
    }

    let config = KitsConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotate(args) => commands::annotate::run(args, &cli.project, &config, cli.threads),
        Commands::ListDbs => commands::list::list_dbs(&config),
        Commands::ListDbSets => commands::list::list_db_sets(),
    }
}
