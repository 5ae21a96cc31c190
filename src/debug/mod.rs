//! Debug bundle writer for inspecting loads and filter evaluation.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{Dataset, IntervalSelection, RunConfig};
use crate::error::AppError;
use crate::filter::FilterOutcome;

fn write_err(e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write debug bundle: {e}"))
}

/// Write a markdown bundle describing the load and the filter outcome into `dir`.
pub fn write_debug_bundle(
    dir: &Path,
    dataset: &Dataset,
    config: &RunConfig,
    outcome: &FilterOutcome<'_>,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("kiva_debug_{ts}.md"));

    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;

    writeln!(file, "# kiva debug bundle").map_err(write_err)?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339()).map_err(write_err)?;
    writeln!(file, "- records: {}", dataset.len()).map_err(write_err)?;
    writeln!(file, "- rows_read: {}", dataset.rows_read()).map_err(write_err)?;
    writeln!(file, "- rows_skipped: {}", dataset.rows_skipped()).map_err(write_err)?;
    writeln!(file, "- scope: {:?}", config.scope).map_err(write_err)?;
    writeln!(file, "- top_n: {}, bins: {}", config.top_n, config.bins).map_err(write_err)?;

    writeln!(file, "\n## Partitions").map_err(write_err)?;
    writeln!(file, "| source | rows_read | rows_used |").map_err(write_err)?;
    writeln!(file, "| - | - | - |").map_err(write_err)?;
    for p in dataset.partitions() {
        writeln!(file, "| {} | {} | {} |", p.source, p.rows_read, p.rows_used).map_err(write_err)?;
    }

    writeln!(file, "\n## Row errors").map_err(write_err)?;
    if dataset.row_errors().is_empty() {
        writeln!(file, "(none)").map_err(write_err)?;
    } else {
        writeln!(file, "| source | line | message |").map_err(write_err)?;
        writeln!(file, "| - | - | - |").map_err(write_err)?;
        for e in dataset.row_errors() {
            writeln!(file, "| {} | {} | {} |", e.source, e.line, e.message.replace('|', "\\|")).map_err(write_err)?;
        }
    }

    let criteria = &config.criteria;
    writeln!(file, "\n## Criteria").map_err(write_err)?;
    writeln!(file, "- countries: {:?}", criteria.countries).map_err(write_err)?;
    writeln!(file, "- sectors: {:?}", criteria.sectors).map_err(write_err)?;
    writeln!(file, "- min_amount: {}", fmt_opt(criteria.min_amount)).map_err(write_err)?;
    writeln!(file, "- max_amount: {}", fmt_opt(criteria.max_amount)).map_err(write_err)?;
    let intervals = match &criteria.intervals {
        IntervalSelection::AllOffered => "all offered".to_string(),
        IntervalSelection::Only(set) => format!("{set:?}"),
    };
    writeln!(file, "- intervals: {intervals}").map_err(write_err)?;

    writeln!(file, "\n## Outcome").map_err(write_err)?;
    match outcome {
        FilterOutcome::Blocked(reason) => {
            writeln!(file, "- blocked: {}", reason.code()).map_err(write_err)?;
        }
        FilterOutcome::Ready(view) => {
            let range = view
                .amount_range()
                .map(|r| format!("{}..{}", r.min, r.max))
                .unwrap_or_else(|| "-".to_string());
            writeln!(file, "- effective_range: {range}").map_err(write_err)?;
            writeln!(file, "- offered_intervals: {:?}", view.offered_intervals()).map_err(write_err)?;
            writeln!(file, "- records: {}", view.len()).map_err(write_err)?;
            writeln!(file, "- skipped_malformed: {}", view.skipped()).map_err(write_err)?;
        }
    }

    Ok(path)
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}
