//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves data sources and loads partitions
//! - applies filter criteria and computes dashboard views
//! - prints tables or JSON
//! - writes optional exports and debug bundles

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::aggregate::ComputedView;
use crate::cli::{Command, FilterArgs, SampleArgs, ShowArgs, SummaryArgs, ViewArgs};
use crate::data::{SampleSpec, resolve_sources, write_partitions};
use crate::domain::{FilterCriteria, OutputFormat, RunConfig, ViewKind};
use crate::error::AppError;
use crate::filter::{BlockReason, FilterOutcome};
use crate::io::{ViewFile, read_view_json, write_view_csv, write_view_json};

pub mod pipeline;

const SUBCOMMANDS: [&str; 7] = ["summary", "filter", "view", "dashboard", "show", "sample", "help"];

/// Entry point for the `kiva` binary.
pub fn run() -> Result<(), AppError> {
    // `kiva` and `kiva -c Kenya` behave like `kiva dashboard ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Filter(args) => handle_filter(args),
        Command::View(args) => handle_view(args),
        Command::Dashboard(args) => handle_dashboard(args),
        Command::Show(args) => handle_show(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// `RUST_LOG` wins; otherwise `-q`/`-v` pick the crate's level. Logs go to stderr.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("kiva_board={level}")));

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let sources = resolve_sources(args.source.data_dir.as_deref(), &args.source.parts);
    let dataset = crate::io::ingest::load_dataset(&sources)?;
    println!("{}", crate::report::format_dataset_summary(&dataset, args.rows));
    Ok(())
}

fn handle_filter(args: FilterArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let dataset = pipeline::load(&config)?;
    let outcome = crate::filter::apply(&dataset, &config.criteria);

    match config.format {
        OutputFormat::Table => {
            println!(
                "{}",
                crate::report::format_filter_summary(&config.criteria, &outcome, config.preview_rows)
            );
        }
        OutputFormat::Json => {
            let report = pipeline::FilterReport::from_outcome(&outcome, config.preview_rows);
            println!("{}", to_json(&report)?);
        }
    }

    maybe_write_debug(&dataset, &config, &outcome)
}

fn handle_view(args: ViewArgs) -> Result<(), AppError> {
    let mut config = run_config_from_args(&args.filter)?;
    config.export_csv = args.export.clone();
    config.save_json = args.save.clone();

    let dataset = pipeline::load(&config)?;
    let run = pipeline::run_views(&dataset, &config, &[args.view]);

    if let FilterOutcome::Blocked(reason) = run.outcome {
        print_blocked(reason, config.format)?;
        return maybe_write_debug(&dataset, &config, &run.outcome);
    }

    for view in &run.views {
        print_view(view, config.format)?;

        if let Some(path) = &config.export_csv {
            write_view_csv(path, view)?;
        }
        if let Some(path) = &config.save_json {
            let file = ViewFile::new(view.clone(), config.criteria.clone(), config.sources.clone());
            write_view_json(path, &file)?;
            info!(path = %path.display(), "view saved");
        }
    }

    maybe_write_debug(&dataset, &config, &run.outcome)
}

fn handle_dashboard(args: FilterArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let dataset = pipeline::load(&config)?;
    let run = pipeline::run_views(&dataset, &config, &ViewKind::ALL);

    if let FilterOutcome::Blocked(reason) = run.outcome {
        print_blocked(reason, config.format)?;
        return maybe_write_debug(&dataset, &config, &run.outcome);
    }

    match config.format {
        OutputFormat::Table => {
            if let Some(view) = run.outcome.view() {
                println!(
                    "{}",
                    crate::report::format_filter_summary(&config.criteria, &run.outcome, 0)
                );
                info!(records = view.len(), "dashboard over filtered view");
            }
            for view in &run.views {
                println!("{}", crate::report::format_view(view));
            }
        }
        OutputFormat::Json => println!("{}", to_json(&run.views)?),
    }

    maybe_write_debug(&dataset, &config, &run.outcome)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let file = read_view_json(&args.file)?;
    match args.format {
        OutputFormat::Table => {
            println!(
                "Saved by {} at {} ({} source(s))",
                file.tool,
                file.generated_at.to_rfc3339(),
                file.sources.len()
            );
            println!("{}", crate::report::format_view(&file.view));
        }
        OutputFormat::Json => println!("{}", to_json(&file)?),
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = SampleSpec {
        rows: args.rows,
        partitions: args.partitions,
        seed: args.seed,
    };
    let paths = write_partitions(&args.out, &spec)?;
    for path in &paths {
        println!("{}", path.display());
    }
    Ok(())
}

/// Build the run configuration from CLI flags plus environment/default sources.
pub fn run_config_from_args(args: &FilterArgs) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        sources: resolve_sources(args.source.data_dir.as_deref(), &args.source.parts),
        criteria: criteria_from_args(args)?,
        scope: args.scope,
        top_n: args.top,
        bins: args.bins,
        preview_rows: args.rows,
        format: args.format,
        export_csv: None,
        save_json: None,
        debug: args.debug,
    })
}

/// Translate filter flags into criteria.
///
/// Both bounds given in the wrong order is a usage error; the engine never reorders them.
pub fn criteria_from_args(args: &FilterArgs) -> Result<FilterCriteria, AppError> {
    if let (Some(min), Some(max)) = (args.min_amount, args.max_amount) {
        if min > max {
            return Err(AppError::new(
                2,
                format!("--min-amount ({min}) must not exceed --max-amount ({max})"),
            ));
        }
    }

    let mut criteria = FilterCriteria::new()
        .with_countries(args.countries.iter().cloned())
        .with_sectors(args.sectors.iter().cloned());
    if let Some(min) = args.min_amount {
        criteria = criteria.with_min_amount(min);
    }
    if let Some(max) = args.max_amount {
        criteria = criteria.with_max_amount(max);
    }
    if args.no_intervals {
        criteria = criteria.without_intervals();
    } else if !args.intervals.is_empty() {
        criteria = criteria.with_intervals(args.intervals.iter().cloned());
    }

    Ok(criteria)
}

fn print_view(view: &ComputedView, format: OutputFormat) -> Result<(), AppError> {
    match format {
        OutputFormat::Table => println!("{}", crate::report::format_view(view)),
        OutputFormat::Json => println!("{}", to_json(view)?),
    }
    Ok(())
}

fn print_blocked(reason: BlockReason, format: OutputFormat) -> Result<(), AppError> {
    match format {
        OutputFormat::Table => print!("{}", crate::report::format_blocked(reason)),
        OutputFormat::Json => {
            let value = serde_json::json!({ "blocked": reason.code(), "prompt": reason.prompt() });
            println!("{}", to_json(&value)?);
        }
    }
    Ok(())
}

fn maybe_write_debug(dataset: &crate::domain::Dataset, config: &RunConfig, outcome: &FilterOutcome<'_>) -> Result<(), AppError> {
    if config.debug {
        let path = crate::debug::write_debug_bundle(Path::new("debug"), dataset, config, outcome)?;
        eprintln!("Debug bundle written to {}", path.display());
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to serialize JSON: {e}")))
}

/// Rewrite argv so `kiva` defaults to `kiva dashboard`.
///
/// Rules:
/// - `kiva`                          -> `kiva dashboard`
/// - `kiva -c Kenya ...`             -> `kiva dashboard -c Kenya ...`
/// - any subcommand present          -> unchanged (`kiva -v summary` still works)
/// - `kiva --help/--version/-h`      -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version");
    if is_top_level_help_or_version {
        return argv;
    }

    let has_subcommand = argv.iter().skip(1).any(|a| SUBCOMMANDS.contains(&a.as_str()));
    if has_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
    }
    argv
}
