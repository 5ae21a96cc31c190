//! Sum/count grouping and top-N.
//!
//! Groups are reported in first-encounter order unless an operation states
//! otherwise; sorts are stable so ties keep that order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::{GroupKey, LoanRecord, ValueKey};

/// Insertion-ordered accumulator keyed by group name.
#[derive(Debug)]
pub(crate) struct Tally<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V: Default> Tally<V> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn slot(&mut self, key: &str) -> &mut V {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), V::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub(crate) fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub group: String,
    pub total: Decimal,
}

/// Per-group sums of one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub group_key: GroupKey,
    pub value_key: ValueKey,
    pub entries: Vec<GroupTotal>,
    /// Records ignored because the group was empty or the value negative.
    pub skipped: usize,
}

impl GroupTotals {
    pub fn get(&self, group: &str) -> Option<Decimal> {
        self.entries.iter().find(|e| e.group == group).map(|e| e.total)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every group total; `None` if it does not fit a `Decimal`.
    pub fn grand_total(&self) -> Option<Decimal> {
        self.entries
            .iter()
            .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.total))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

/// Per-group record (or borrower) counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounts {
    /// Column label for the groups (e.g. `repayment_interval`, `gender`).
    pub label: String,
    pub entries: Vec<GroupCount>,
    pub skipped: usize,
}

impl GroupCounts {
    pub fn get(&self, group: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.group == group).map(|e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Fraction of the total held by `group` (`None` for unknown groups).
    pub fn share(&self, group: &str) -> Option<f64> {
        let total = self.total();
        let count = self.get(group)?;
        (total > 0).then(|| count as f64 / total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCell {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Two-key counts with per-`a` totals, for stacked/normalized display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTab {
    pub key_a: GroupKey,
    pub key_b: GroupKey,
    pub cells: Vec<CrossCell>,
    pub totals: Vec<GroupCount>,
    pub skipped: usize,
}

impl CrossTab {
    pub fn count(&self, a: &str, b: &str) -> usize {
        self.cells
            .iter()
            .find(|c| c.a == a && c.b == b)
            .map_or(0, |c| c.count)
    }

    pub fn total(&self, a: &str) -> usize {
        self.totals.iter().find(|t| t.group == a).map_or(0, |t| t.count)
    }

    /// Share of `(a, b)` within `a` (what a normalized stacked bar shows).
    pub fn share(&self, a: &str, b: &str) -> f64 {
        match self.total(a) {
            0 => 0.0,
            total => self.count(a, b) as f64 / total as f64,
        }
    }

    /// Cells belonging to one `a` group, in encounter order.
    pub fn row<'s>(&'s self, a: &'s str) -> impl Iterator<Item = &'s CrossCell> + 's {
        self.cells.iter().filter(move |c| c.a == a)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Sum `value` per `group`. Every observed group is present, even with a zero sum.
///
/// Records with an empty key, a negative value, or a value that would overflow
/// the group total are counted in `skipped`.
pub fn sum_by_group<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
    group: GroupKey,
    value: ValueKey,
) -> GroupTotals {
    let mut tally: Tally<Decimal> = Tally::new();
    let mut skipped = 0usize;

    for record in records {
        let amount = record.value(value);
        match record.group_value(group) {
            Some(key) if amount >= Decimal::ZERO => {
                // A record that would overflow its group's total is skipped.
                let slot = tally.slot(&key);
                match slot.checked_add(amount) {
                    Some(total) => *slot = total,
                    None => skipped += 1,
                }
            }
            _ => skipped += 1,
        }
    }

    GroupTotals {
        group_key: group,
        value_key: value,
        entries: tally
            .into_entries()
            .into_iter()
            .map(|(group, total)| GroupTotal { group, total })
            .collect(),
        skipped,
    }
}

/// Count records per `group`, largest first (ties in encounter order).
pub fn count_by_group<'a>(records: impl IntoIterator<Item = &'a LoanRecord>, group: GroupKey) -> GroupCounts {
    let mut tally: Tally<usize> = Tally::new();
    let mut skipped = 0usize;

    for record in records {
        match record.group_value(group) {
            Some(key) => *tally.slot(&key) += 1,
            None => skipped += 1,
        }
    }

    counts_descending(group.label(), tally, skipped)
}

pub(crate) fn counts_descending(label: &str, tally: Tally<usize>, skipped: usize) -> GroupCounts {
    let mut entries: Vec<GroupCount> = tally
        .into_entries()
        .into_iter()
        .map(|(group, count)| GroupCount { group, count })
        .collect();
    entries.sort_by(|x, y| y.count.cmp(&x.count));

    GroupCounts {
        label: label.to_string(),
        entries,
        skipped,
    }
}

/// Count records per `(a, b)` pair, plus per-`a` totals.
pub fn count_by_group_2d<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
    key_a: GroupKey,
    key_b: GroupKey,
) -> CrossTab {
    let mut cells: Tally<usize> = Tally::new();
    let mut totals: Tally<usize> = Tally::new();
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let (Some(a), Some(b)) = (record.group_value(key_a), record.group_value(key_b)) else {
            skipped += 1;
            continue;
        };
        // Cells are keyed by an unambiguous composite so names containing
        // separators cannot collide.
        let composite = format!("{}\u{1f}{}", a, b);
        let cell = cells.slot(&composite);
        if *cell == 0 {
            pairs.push((a.to_string(), b.to_string()));
        }
        *cell += 1;
        *totals.slot(&a) += 1;
    }

    let cells = cells
        .into_entries()
        .into_iter()
        .zip(pairs)
        .map(|((_, count), (a, b))| CrossCell { a, b, count })
        .collect();
    let totals = totals
        .into_entries()
        .into_iter()
        .map(|(group, count)| GroupCount { group, count })
        .collect();

    CrossTab {
        key_a,
        key_b,
        cells,
        totals,
        skipped,
    }
}

/// The `n` groups with the highest summed `value`, descending.
///
/// Ties keep first-encounter order; `n` beyond the group count returns every group.
pub fn top_n<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
    group: GroupKey,
    value: ValueKey,
    n: usize,
) -> GroupTotals {
    let mut totals = sum_by_group(records, group, value);
    totals.entries.sort_by(|x, y| y.total.cmp(&x.total));
    totals.entries.truncate(n);
    totals
}

/// Lossy conversion for display-only math (shares, widths).
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
