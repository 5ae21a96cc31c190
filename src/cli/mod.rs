//! Command-line parsing for the Kiva loans dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the filter/aggregation code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::domain::{OutputFormat, Scope, ViewKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "kiva", version, about = "Kiva loans filter & aggregate dashboard (terminal)")]
pub struct Cli {
    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the dataset and print partition stats, a preview, and the filter options.
    Summary(SummaryArgs),
    /// Apply filter criteria and print the effective range, offered intervals, and a preview.
    Filter(FilterArgs),
    /// Compute one dashboard view.
    View(ViewArgs),
    /// Compute every dashboard view in catalog order.
    Dashboard(FilterArgs),
    /// Re-print a view saved with `kiva view --save`.
    Show(ShowArgs),
    /// Write synthetic loan partitions for demos and tests.
    Sample(SampleArgs),
}

/// Where the partitions are loaded from.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Directory holding the default partition files.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Partition path or URL (repeatable). Overrides the defaults.
    #[arg(long = "part", value_name = "PATH|URL")]
    pub parts: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of preview rows.
    #[arg(long, default_value_t = 5)]
    pub rows: usize,
}

/// Filter criteria and view options shared by `filter`, `view`, and `dashboard`.
#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Country to include (repeatable).
    #[arg(short = 'c', long = "country", value_name = "NAME")]
    pub countries: Vec<String>,

    /// Sector to include (repeatable).
    #[arg(short = 's', long = "sector", value_name = "NAME")]
    pub sectors: Vec<String>,

    /// Lower loan-amount bound (defaults to the selection's minimum).
    #[arg(long, value_name = "AMOUNT")]
    pub min_amount: Option<Decimal>,

    /// Upper loan-amount bound (defaults to the selection's maximum).
    #[arg(long, value_name = "AMOUNT")]
    pub max_amount: Option<Decimal>,

    /// Repayment interval to keep (repeatable). Defaults to all offered intervals.
    #[arg(short = 'i', long = "interval", value_name = "NAME")]
    pub intervals: Vec<String>,

    /// Deselect every repayment interval.
    #[arg(long, conflicts_with = "intervals")]
    pub no_intervals: bool,

    /// Compute views over the filtered view or the whole dataset.
    #[arg(long, value_enum, default_value_t = Scope::View)]
    pub scope: Scope,

    /// Number of countries in the top-countries view.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Histogram bins in the top-countries view.
    #[arg(long, default_value_t = 20)]
    pub bins: usize,

    /// Number of preview rows.
    #[arg(long, default_value_t = 5)]
    pub rows: usize,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write a markdown debug bundle into `debug/`.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ViewArgs {
    /// Which view to compute.
    #[arg(value_enum)]
    pub view: ViewKind,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Export the view's table to CSV.
    ///
    /// `top-countries` exports its histogram (one row per bin and sector);
    /// use `--save` or `--format json` for the country ranking.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Save the computed view to JSON (re-print with `kiva show`).
    #[arg(long, value_name = "JSON")]
    pub save: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// View JSON file produced by `kiva view --save`.
    #[arg(long, value_name = "JSON")]
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output directory for the partition files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Total number of loans to generate.
    #[arg(short = 'n', long, default_value_t = 3000)]
    pub rows: usize,

    /// Number of partition files.
    #[arg(long, default_value_t = 3)]
    pub partitions: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn view_flags_parse() {
        let cli = Cli::try_parse_from([
            "kiva",
            "view",
            "top-countries",
            "-c",
            "Kenya",
            "--sector",
            "Food",
            "--min-amount",
            "100.5",
            "--scope",
            "dataset",
            "--save",
            "out.json",
        ])
        .unwrap();
        let Command::View(args) = cli.command else {
            panic!("expected view command");
        };
        assert_eq!(args.view, ViewKind::TopCountries);
        assert_eq!(args.filter.countries, vec!["Kenya".to_string()]);
        assert_eq!(args.filter.min_amount, Some(Decimal::new(1005, 1)));
        assert_eq!(args.filter.scope, Scope::Dataset);
        assert_eq!(args.save, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn export_help_describes_top_countries_layout() {
        let cmd = Cli::command();
        let view = cmd.find_subcommand("view").unwrap();
        let export = view.get_arguments().find(|a| a.get_id() == "export").unwrap();
        let help = export.get_long_help().or(export.get_help()).unwrap().to_string();
        assert!(help.contains("top-countries"));
        assert!(help.contains("--save"));
    }

    #[test]
    fn interval_flags_conflict() {
        let res = Cli::try_parse_from(["kiva", "filter", "-c", "Kenya", "-i", "monthly", "--no-intervals"]);
        assert!(res.is_err());
    }
}
