//! Course Loader CLI
//!
//! Command-line tool for exporting Alma course loader files from a course
//! catalog and for diffing two generations of an export.

use clap::{Parser, Subcommand};
use cl_core::{
    diff, export, CatalogReader, Change, CourseReader, CourseWriter, DiffObserver, DiffOptions,
    DiffSinks, Error, ExportConfig, Flow, Operation,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(about = "Alma course loader file tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export selected catalog courses to a course loader file
    Export {
        /// Export configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter expression; repeat to require several
        #[arg(short, long = "filter")]
        filter: Vec<String>,

        /// Mark every row as an update (the default)
        #[arg(long, conflicts_with_all = ["delete", "rollover"])]
        update: bool,

        /// Mark every row for deletion
        #[arg(long, conflicts_with = "rollover")]
        delete: bool,

        /// Mark every row as a rollover from its previous course
        #[arg(long)]
        rollover: bool,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Log debug output
        #[arg(short, long)]
        verbose: bool,

        /// Catalog file (JSON)
        catalog: Option<PathBuf>,
    },

    /// Diff two course loader files into create/update/delete files
    Diff {
        /// Output file for new courses
        #[arg(long)]
        create: Option<PathBuf>,

        /// Output file for removed courses
        #[arg(long)]
        delete: Option<PathBuf>,

        /// Output file for changed courses
        #[arg(long)]
        update: Option<PathBuf>,

        /// Write new courses with previous course details as rollovers
        #[arg(long)]
        rollover: bool,

        /// Log every change
        #[arg(short, long)]
        verbose: bool,

        /// Append logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Previous export
        old: PathBuf,

        /// Current export
        new: PathBuf,
    },

    /// Compile filter expressions and show how they are interpreted
    CheckFilter {
        /// Filter expressions
        #[arg(required = true)]
        expression: Vec<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> cl_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            config,
            filter,
            update,
            delete,
            rollover,
            output,
            log_file,
            verbose,
            catalog,
        } => {
            let operation = if delete {
                Some(Operation::Delete)
            } else if rollover {
                Some(Operation::Rollover)
            } else if update {
                Some(Operation::Update)
            } else {
                None
            };
            let overrides = ExportConfig {
                catalog,
                output,
                log_file,
                filters: filter,
                operation,
            };
            cmd_export(config.as_deref(), overrides, verbose)
        }
        Commands::Diff {
            create,
            delete,
            update,
            rollover,
            verbose,
            log_file,
            old,
            new,
        } => {
            setup_logging(log_file.as_deref(), verbose)?;
            let sinks = DiffSinks {
                create,
                delete,
                update,
            };
            cmd_diff(&old, &new, &sinks, DiffOptions { rollover }, verbose)
        }
        Commands::CheckFilter { expression } => cmd_check_filter(&expression),
    }
}

fn setup_logging(log_file: Option<&Path>, verbose: bool) -> cl_core::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::FileWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn cmd_export(
    config_path: Option<&Path>,
    overrides: ExportConfig,
    verbose: bool,
) -> cl_core::Result<()> {
    let config = match config_path {
        Some(path) => ExportConfig::load(path)?.merge(overrides),
        None => overrides,
    };
    setup_logging(config.log_file.as_deref(), verbose)?;

    let catalog_path = config.catalog_path()?;
    let output_path = config.output_path()?;

    let reader = CatalogReader::load(catalog_path)?;
    info!(
        "Loaded {} courses from {}",
        reader.catalog().courses.len(),
        catalog_path.display()
    );

    // Compile every filter before touching the output file
    let filters = reader.extractors().compile_all(&config.filters)?;
    for filter in &filters {
        debug!("Filter: {}", filter.spec().source);
    }

    let mut writer = CourseWriter::create(output_path)?;
    let written = export(&reader, &filters, config.operation(), &mut writer)?;
    writer.finish()?;

    println!("Exported {} rows to {}", written, output_path.display());

    Ok(())
}

fn cmd_diff(
    old: &Path,
    new: &Path,
    sinks: &DiffSinks,
    options: DiffOptions,
    verbose: bool,
) -> cl_core::Result<()> {
    let mut log_change = |change: &Change<'_>, options: &DiffOptions| {
        info!(
            key = %change.key(),
            rollover = options.rollover,
            "{}",
            change.operation()
        );
        Flow::Continue
    };
    let observer: Option<&mut dyn DiffObserver> = if verbose {
        Some(&mut log_change as &mut dyn DiffObserver)
    } else {
        None
    };

    let summary = diff(old, new, sinks, &options, observer)?;

    println!("Diff of {} -> {}:", old.display(), new.display());
    println!(
        "  {} created ({} rollover)",
        summary.created, summary.rolled_over
    );
    println!("  {} updated", summary.updated);
    println!("  {} deleted", summary.deleted);
    if summary.skipped > 0 {
        println!("  {} skipped", summary.skipped);
    }

    Ok(())
}

fn cmd_check_filter(expressions: &[String]) -> cl_core::Result<()> {
    let table = CatalogReader::extractor_table();
    let mut invalid = 0;

    for expression in expressions {
        match table.compile(expression) {
            Ok(filter) => {
                let spec = filter.spec();
                let extractor = spec
                    .extractor
                    .as_deref()
                    .or(table.default_name())
                    .unwrap_or_default();
                println!("{}", spec.source);
                println!("  extractor:  {}", extractor);
                println!(
                    "  operator:   {}",
                    spec.operator.map_or("(default)", |op| op.symbol())
                );
                println!("  comparison: {}", spec.comparison.name());
                println!("  value:      {}", spec.value);
                println!("  negate:     {}", spec.negate);
            }
            Err(e) => {
                println!("{}", expression);
                println!("  error: {}", e);
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        return Err(Error::Config(format!("{} invalid filter(s)", invalid)));
    }

    Ok(())
}
