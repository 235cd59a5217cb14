use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use example_materializer::{MaterializeOptions, Materializer, Mode, DEFAULT_INDENT};

#[derive(Parser)]
#[command(name = "materialize")]
#[command(about = "Write JSON snapshots of the values exported by typed example files", long_about = None)]
struct Cli {
    /// Source files or directories to materialize
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Enable debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Verify existing snapshots instead of writing them
    #[arg(long)]
    check: bool,

    /// Indentation width of the written JSON
    #[arg(long, default_value_t = DEFAULT_INDENT)]
    indent: usize,

    /// Number of worker threads (defaults to one per core)
    #[arg(short, long, env = "MATERIALIZE_JOBS")]
    jobs: Option<usize>,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure the worker pool")?;
    }

    let mode = if cli.check { Mode::Check } else { Mode::Write };
    let materializer = Materializer::new(MaterializeOptions {
        indent: cli.indent,
        mode,
    });

    let report = materializer.run(&cli.paths);
    if report.outcomes.is_empty() {
        warn!("no source files found");
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "done"
    );

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
