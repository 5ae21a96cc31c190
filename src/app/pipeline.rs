//! Shared "dashboard pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve sources -> load partitions -> apply criteria -> compute views
//!
//! The command handlers can then focus on presentation (tables vs JSON).

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{ComputedView, ViewParams, compute_view};
use crate::domain::{AmountRange, Dataset, LoanRecord, RunConfig, Scope, ViewKind};
use crate::error::AppError;
use crate::filter::{BlockReason, FilterOutcome, apply};
use crate::io::ingest::load_dataset;

/// Outputs of one filter + views pass over a loaded dataset.
#[derive(Debug, Clone)]
pub struct RunOutput<'a> {
    pub outcome: FilterOutcome<'a>,
    /// Empty when the outcome is blocked.
    pub views: Vec<ComputedView>,
}

/// Load every configured partition.
pub fn load(config: &RunConfig) -> Result<Dataset, AppError> {
    let dataset = load_dataset(&config.sources)?;
    info!(
        records = dataset.len(),
        skipped = dataset.rows_skipped(),
        partitions = dataset.partitions().len(),
        "dataset ready"
    );
    Ok(dataset)
}

/// Apply the configured criteria and compute `kinds` over the configured scope.
///
/// Views are independent, so they are computed in parallel; output order follows `kinds`.
pub fn run_views<'a>(dataset: &'a Dataset, config: &RunConfig, kinds: &[ViewKind]) -> RunOutput<'a> {
    let outcome = apply(dataset, &config.criteria);

    let views = match &outcome {
        FilterOutcome::Blocked(reason) => {
            info!(reason = reason.code(), "pipeline blocked");
            Vec::new()
        }
        FilterOutcome::Ready(view) => {
            debug!(
                records = view.len(),
                skipped = view.skipped(),
                offered = view.offered_intervals().len(),
                "filter applied"
            );

            let params = ViewParams {
                top_n: config.top_n,
                bins: config.bins,
            };
            let all: Vec<&LoanRecord>;
            let records: &[&LoanRecord] = match config.scope {
                Scope::View => view.records(),
                Scope::Dataset => {
                    all = dataset.records().iter().collect();
                    &all
                }
            };

            kinds
                .par_iter()
                .map(|&kind| compute_view(kind, config.scope, records, &params))
                .collect()
        }
    };

    RunOutput { outcome, views }
}

/// JSON shape of `kiva filter --format json`.
#[derive(Debug, Serialize)]
pub struct FilterReport<'a> {
    pub blocked: Option<BlockReason>,
    pub prompt: Option<&'static str>,
    pub records: usize,
    pub skipped: usize,
    pub amount_range: Option<AmountRange>,
    pub offered_intervals: &'a [String],
    pub preview: &'a [&'a LoanRecord],
}

impl<'a> FilterReport<'a> {
    pub fn from_outcome(outcome: &'a FilterOutcome<'a>, preview_rows: usize) -> Self {
        match outcome {
            FilterOutcome::Blocked(reason) => Self {
                blocked: Some(*reason),
                prompt: Some(reason.prompt()),
                records: 0,
                skipped: 0,
                amount_range: None,
                offered_intervals: &[],
                preview: &[],
            },
            FilterOutcome::Ready(view) => Self {
                blocked: None,
                prompt: None,
                records: view.len(),
                skipped: view.skipped(),
                amount_range: view.amount_range(),
                offered_intervals: view.offered_intervals(),
                preview: &view.records()[..view.len().min(preview_rows)],
            },
        }
    }
}
