//! Export a computed view to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one tidy table per view. The top-countries view exports its
//! histogram in long form (one row per bin and sector); the ranking itself is
//! available through `--save` JSON.

use std::path::Path;

use tracing::info;

use crate::aggregate::{ComputedView, ViewData};
use crate::error::AppError;

/// Write a view's table to a CSV file.
pub fn write_view_csv(path: &Path, view: &ComputedView) -> Result<(), AppError> {
    let rows = view_rows(&view.data);

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;

    info!(path = %path.display(), rows = rows.len().saturating_sub(1), "view exported");
    Ok(())
}

/// Header row followed by data rows.
fn view_rows(data: &ViewData) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    match data {
        ViewData::Totals(totals) => {
            rows.push(vec![
                totals.group_key.label().to_string(),
                format!("sum_{}", totals.value_key.label()),
            ]);
            for e in &totals.entries {
                rows.push(vec![e.group.clone(), e.total.to_string()]);
            }
        }
        ViewData::Counts(counts) => {
            rows.push(vec![counts.label.clone(), "count".to_string(), "share".to_string()]);
            for e in &counts.entries {
                let share = counts.share(&e.group).unwrap_or(0.0);
                rows.push(vec![e.group.clone(), e.count.to_string(), format!("{share:.6}")]);
            }
        }
        ViewData::Cross(tab) => {
            rows.push(vec![
                tab.key_a.label().to_string(),
                tab.key_b.label().to_string(),
                "count".to_string(),
                "share".to_string(),
            ]);
            for c in &tab.cells {
                rows.push(vec![
                    c.a.clone(),
                    c.b.clone(),
                    c.count.to_string(),
                    format!("{:.6}", tab.share(&c.a, &c.b)),
                ]);
            }
        }
        ViewData::Boxes(table) => {
            rows.push(
                [
                    table.group_key.label(),
                    "count",
                    "min",
                    "q1",
                    "median",
                    "q3",
                    "max",
                    "lower_whisker",
                    "upper_whisker",
                    "outliers",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            );
            for s in &table.groups {
                rows.push(vec![
                    s.group.clone(),
                    s.count.to_string(),
                    s.min.to_string(),
                    s.q1.to_string(),
                    s.median.to_string(),
                    s.q3.to_string(),
                    s.max.to_string(),
                    s.lower_whisker.to_string(),
                    s.upper_whisker.to_string(),
                    s.outliers.to_string(),
                ]);
            }
        }
        ViewData::TopHistogram { histogram, .. } => {
            let stack = histogram.stack_key.map_or("stack", |k| k.label());
            rows.push(vec![
                "bin_lower".to_string(),
                "bin_upper".to_string(),
                stack.to_string(),
                "count".to_string(),
            ]);
            for bin in &histogram.bins {
                for s in &bin.stacks {
                    rows.push(vec![
                        bin.lower.round_dp(2).to_string(),
                        bin.upper.round_dp(2).to_string(),
                        s.group.clone(),
                        s.count.to_string(),
                    ]);
                }
            }
        }
    }

    rows
}
