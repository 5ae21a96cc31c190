//! Value distributions: five-number summaries and histograms.
//!
//! Quartiles use linear interpolation between closest ranks (the convention
//! of common box-plot tooling). Whiskers reach the most extreme values within
//! 1.5 × IQR of the quartiles; values beyond are counted as outliers.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::aggregate::group::{GroupCount, Tally};
use crate::domain::{GroupKey, LoanRecord, ValueKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub min: Decimal,
    pub q1: Decimal,
    pub median: Decimal,
    pub q3: Decimal,
    pub max: Decimal,
    pub lower_whisker: Decimal,
    pub upper_whisker: Decimal,
    pub outliers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxTable {
    pub group_key: GroupKey,
    pub value_key: ValueKey,
    pub groups: Vec<BoxStats>,
    pub skipped: usize,
}

impl BoxTable {
    pub fn get(&self, group: &str) -> Option<&BoxStats> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: Decimal,
    pub upper: Decimal,
    pub count: usize,
    /// Per-stack-group counts within the bin (empty without a stack key).
    pub stacks: Vec<GroupCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub value_key: ValueKey,
    pub stack_key: Option<GroupKey>,
    pub bins: Vec<HistogramBin>,
    pub skipped: usize,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Five-number summary of `value` per `group`, groups in encounter order.
pub fn box_stats_by_group<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
    group: GroupKey,
    value: ValueKey,
) -> BoxTable {
    let mut tally: Tally<Vec<Decimal>> = Tally::new();
    let mut skipped = 0usize;

    for record in records {
        let amount = record.value(value);
        match record.group_value(group) {
            Some(key) if amount >= Decimal::ZERO => tally.slot(&key).push(amount),
            _ => skipped += 1,
        }
    }

    let groups = tally
        .into_entries()
        .into_iter()
        .filter_map(|(group, values)| box_stats(group, values))
        .collect();

    BoxTable {
        group_key: group,
        value_key: value,
        groups,
        skipped,
    }
}

/// Summary of a single sample; `None` when empty.
pub fn box_stats(group: String, mut values: Vec<Decimal>) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    values.sort();

    let q1 = quantile(&values, Decimal::new(25, 2));
    let median = quantile(&values, Decimal::new(5, 1));
    let q3 = quantile(&values, Decimal::new(75, 2));
    // Fences saturate at the `Decimal` limits instead of overflowing.
    let reach = (q3 - q1).checked_mul(Decimal::new(15, 1)).unwrap_or(Decimal::MAX);
    let low_fence = q1.checked_sub(reach).unwrap_or(Decimal::MIN);
    let high_fence = q3.checked_add(reach).unwrap_or(Decimal::MAX);

    let inside: Vec<Decimal> = values
        .iter()
        .copied()
        .filter(|v| *v >= low_fence && *v <= high_fence)
        .collect();

    Some(BoxStats {
        group,
        count: values.len(),
        min: values[0],
        q1,
        median,
        q3,
        max: values[values.len() - 1],
        // The quartiles always lie inside the fences, so `inside` is never empty.
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers: values.len() - inside.len(),
    })
}

/// Linear-interpolated quantile of sorted, non-empty `values`.
fn quantile(values: &[Decimal], p: Decimal) -> Decimal {
    let pos = Decimal::from(values.len() - 1) * p;
    let lo = pos.floor();
    let frac = pos - lo;
    let lo_idx = lo.to_usize().unwrap_or(0).min(values.len() - 1);
    let hi_idx = (lo_idx + 1).min(values.len() - 1);
    let (lo_v, hi_v) = (values[lo_idx], values[hi_idx]);
    (hi_v - lo_v)
        .checked_mul(frac)
        .and_then(|step| lo_v.checked_add(step))
        .unwrap_or(lo_v)
}

/// Equal-width histogram of `value` over `[min, max]`, optionally stacked by a key.
///
/// The last bin is closed so the maximum is counted. A zero-width sample
/// collapses to a single bin.
pub fn histogram<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
    value: ValueKey,
    bins: usize,
    stack: Option<GroupKey>,
) -> Histogram {
    let mut samples: Vec<(Decimal, Option<String>)> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let amount = record.value(value);
        if amount < Decimal::ZERO {
            skipped += 1;
            continue;
        }
        match stack {
            None => samples.push((amount, None)),
            Some(key) => match record.group_value(key) {
                Some(group) => samples.push((amount, Some(group.into_owned()))),
                None => skipped += 1,
            },
        }
    }

    let Some(min) = samples.iter().map(|(v, _)| *v).min() else {
        return Histogram {
            value_key: value,
            stack_key: stack,
            bins: Vec::new(),
            skipped,
        };
    };
    let max = samples.iter().map(|(v, _)| *v).max().unwrap_or(min);

    let n_bins = if max == min { 1 } else { bins.max(1) };
    let width = (max - min) / Decimal::from(n_bins);

    let mut counts = vec![0usize; n_bins];
    let mut stacks: Vec<Tally<usize>> = (0..n_bins).map(|_| Tally::new()).collect();

    for (amount, group) in &samples {
        let idx = if width.is_zero() {
            0
        } else {
            ((*amount - min) / width).floor().to_usize().unwrap_or(0).min(n_bins - 1)
        };
        counts[idx] += 1;
        if let Some(group) = group {
            *stacks[idx].slot(group) += 1;
        }
    }

    let bins = counts
        .into_iter()
        .zip(stacks)
        .enumerate()
        .map(|(i, (count, tally))| HistogramBin {
            lower: bin_edge(min, width, i, max),
            upper: if i + 1 == n_bins { max } else { bin_edge(min, width, i + 1, max) },
            count,
            stacks: tally
                .into_entries()
                .into_iter()
                .map(|(group, count)| GroupCount { group, count })
                .collect(),
        })
        .collect();

    Histogram {
        value_key: value,
        stack_key: stack,
        bins,
        skipped,
    }
}

/// `min + width * i`, clamped to `max`.
fn bin_edge(min: Decimal, width: Decimal, i: usize, max: Decimal) -> Decimal {
    width
        .checked_mul(Decimal::from(i))
        .and_then(|offset| min.checked_add(offset))
        .map_or(max, |edge| edge.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, sector: &str, funded: i64) -> LoanRecord {
        LoanRecord {
            id: None,
            country: country.to_string(),
            sector: sector.to_string(),
            loan_amount: Decimal::from(funded),
            funded_amount: Decimal::from(funded),
            repayment_interval: "monthly".to_string(),
            borrower_genders: "female".to_string(),
        }
    }

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn quartiles_interpolate() {
        let stats = box_stats("x".to_string(), vec![dec(4), dec(1), dec(3), dec(2)]).unwrap();
        assert_eq!(stats.min, dec(1));
        assert_eq!(stats.q1, Decimal::new(175, 2));
        assert_eq!(stats.median, Decimal::new(25, 1));
        assert_eq!(stats.q3, Decimal::new(325, 2));
        assert_eq!(stats.max, dec(4));
        assert_eq!(stats.outliers, 0);
    }

    #[test]
    fn whiskers_stop_at_the_fences() {
        let values = vec![dec(10), dec(11), dec(12), dec(13), dec(14), dec(100)];
        let stats = box_stats("x".to_string(), values).unwrap();
        assert_eq!(stats.upper_whisker, dec(14));
        assert_eq!(stats.lower_whisker, dec(10));
        assert_eq!(stats.outliers, 1);
        assert_eq!(stats.max, dec(100));
    }

    #[test]
    fn single_value_summary() {
        let stats = box_stats("x".to_string(), vec![dec(7)]).unwrap();
        assert_eq!(stats.q1, dec(7));
        assert_eq!(stats.q3, dec(7));
        assert!(box_stats("x".to_string(), Vec::new()).is_none());
    }

    #[test]
    fn box_table_groups_in_encounter_order() {
        let records = [record("Peru", "Food", 100), record("Kenya", "Food", 50), record("Peru", "Food", 300)];
        let table = box_stats_by_group(&records, GroupKey::Country, ValueKey::LoanAmount);
        assert_eq!(table.groups[0].group, "Peru");
        assert_eq!(table.get("Peru").map(|s| s.median), Some(dec(200)));
        assert_eq!(table.get("Kenya").map(|s| s.count), Some(1));
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let records = [
            record("Kenya", "Food", 0),
            record("Kenya", "Retail", 25),
            record("Kenya", "Food", 50),
            record("Peru", "Food", 75),
            record("Peru", "Food", 100),
        ];
        let hist = histogram(&records, ValueKey::FundedAmount, 4, Some(GroupKey::Sector));
        assert_eq!(hist.bins.len(), 4);
        assert_eq!(hist.total(), 5);
        assert_eq!(hist.bins[0].lower, dec(0));
        assert_eq!(hist.bins[3].upper, dec(100));
        // The maximum lands in the closed last bin.
        assert_eq!(hist.bins[3].count, 2);
        assert_eq!(hist.bins[1].stacks, vec![GroupCount { group: "Retail".to_string(), count: 1 }]);
    }

    #[test]
    fn degenerate_histograms() {
        let empty: Vec<LoanRecord> = Vec::new();
        assert!(histogram(&empty, ValueKey::FundedAmount, 10, None).is_empty());

        let same = [record("Kenya", "Food", 50), record("Peru", "Food", 50)];
        let hist = histogram(&same, ValueKey::FundedAmount, 10, None);
        assert_eq!(hist.bins.len(), 1);
        assert_eq!(hist.bins[0].count, 2);
        assert!(hist.bins[0].stacks.is_empty());

        let hist = histogram(&same, ValueKey::FundedAmount, 0, None);
        assert_eq!(hist.total(), 2);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let stats = box_stats("big".to_string(), vec![Decimal::ZERO, Decimal::MAX, Decimal::MAX]).unwrap();
        assert_eq!(stats.max, Decimal::MAX);
        assert_eq!(stats.q3, Decimal::MAX);
        assert_eq!(stats.outliers, 0);

        let mut big = record("Kenya", "Food", 0);
        big.funded_amount = Decimal::MAX;
        let hist = histogram(&[record("Peru", "Food", 0), big], ValueKey::FundedAmount, 3, None);
        assert_eq!(hist.total(), 2);
        assert_eq!(hist.bins[2].upper, Decimal::MAX);
        assert_eq!(hist.bins[2].count, 1);
    }
}
