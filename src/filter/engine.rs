//! Criteria evaluation over an immutable dataset.
//!
//! Evaluation order:
//! 1. block when neither a country nor a sector is selected
//! 2. category membership (sector set AND country set; OR within a set)
//! 3. loan-amount range, missing bounds taken from the category view
//! 4. repayment intervals, offered from the range-filtered view
//!
//! `apply` is pure: the view borrows records from the dataset and keeps their order.

use serde::Serialize;

use crate::domain::{
    AmountRange, Dataset, FilterCriteria, GroupKey, IntervalSelection, LoanRecord, distinct_values,
};

/// Why the pipeline halted waiting for more input. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    NoCategorySelected,
    NoIntervalSelected,
}

impl BlockReason {
    pub fn code(self) -> &'static str {
        match self {
            BlockReason::NoCategorySelected => "no-category-selected",
            BlockReason::NoIntervalSelected => "no-interval-selected",
        }
    }

    /// User-facing prompt shown instead of any view.
    pub fn prompt(self) -> &'static str {
        match self {
            BlockReason::NoCategorySelected => {
                "Please select at least one sector or country (--sector / --country) to view data."
            }
            BlockReason::NoIntervalSelected => "Please select a repayment interval (--interval) to view data.",
        }
    }
}

/// Records that passed every constraint, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    records: Vec<&'a LoanRecord>,
    amount_range: Option<AmountRange>,
    offered_intervals: Vec<String>,
    skipped: usize,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a LoanRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a LoanRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// An empty view is a valid result ("no data"), not a failure.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loan-amount range actually applied; `None` when no record matched the categories.
    pub fn amount_range(&self) -> Option<AmountRange> {
        self.amount_range
    }

    /// Repayment intervals present after the range filter (the selectable options).
    pub fn offered_intervals(&self) -> &[String] {
        &self.offered_intervals
    }

    /// Malformed records ignored during evaluation.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome<'a> {
    Ready(FilteredView<'a>),
    Blocked(BlockReason),
}

impl<'a> FilterOutcome<'a> {
    pub fn view(&self) -> Option<&FilteredView<'a>> {
        match self {
            FilterOutcome::Ready(view) => Some(view),
            FilterOutcome::Blocked(_) => None,
        }
    }

    pub fn blocked(&self) -> Option<BlockReason> {
        match self {
            FilterOutcome::Ready(_) => None,
            FilterOutcome::Blocked(reason) => Some(*reason),
        }
    }
}

/// Evaluate `criteria` against `dataset`.
pub fn apply<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilterOutcome<'a> {
    if !criteria.has_category() {
        return FilterOutcome::Blocked(BlockReason::NoCategorySelected);
    }

    let mut skipped = 0usize;
    let category_view: Vec<&LoanRecord> = dataset
        .records()
        .iter()
        .filter(|r| {
            if !r.is_well_formed() {
                skipped += 1;
                return false;
            }
            criteria.matches_sector(r.sector.trim()) && criteria.matches_country(r.country.trim())
        })
        .collect();

    let amount_range = effective_range(&category_view, criteria);
    let ranged: Vec<&LoanRecord> = match amount_range {
        Some(range) => category_view
            .into_iter()
            .filter(|r| range.contains(r.loan_amount))
            .collect(),
        None => Vec::new(),
    };

    let offered_intervals = distinct_values(ranged.iter().copied(), GroupKey::RepaymentInterval);

    let records = match &criteria.intervals {
        IntervalSelection::AllOffered => ranged,
        IntervalSelection::Only(selected) if selected.is_empty() => {
            return FilterOutcome::Blocked(BlockReason::NoIntervalSelected);
        }
        IntervalSelection::Only(selected) => ranged
            .into_iter()
            .filter(|r| selected.contains(r.repayment_interval.trim()))
            .collect(),
    };

    FilterOutcome::Ready(FilteredView {
        records,
        amount_range,
        offered_intervals,
        skipped,
    })
}

/// Explicit bounds win; a missing bound is the min/max of the current view.
///
/// Bounds are not reordered here: a lower bound above the data's maximum
/// yields an empty range rather than a swapped one.
fn effective_range(view: &[&LoanRecord], criteria: &FilterCriteria) -> Option<AmountRange> {
    let observed = observed_range(view);
    let min = criteria.min_amount.or(observed.map(|r| r.min))?;
    let max = criteria.max_amount.or(observed.map(|r| r.max))?;
    Some(AmountRange { min, max })
}

/// `[min, max]` of `loan_amount` over `records`, or `None` when empty.
pub fn observed_range(records: &[&LoanRecord]) -> Option<AmountRange> {
    records.iter().fold(None, |acc: Option<AmountRange>, r| {
        Some(match acc {
            None => AmountRange {
                min: r.loan_amount,
                max: r.loan_amount,
            },
            Some(range) => AmountRange {
                min: range.min.min(r.loan_amount),
                max: range.max.max(r.loan_amount),
            },
        })
    })
}
