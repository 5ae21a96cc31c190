//! Dashboard view catalog: which aggregate each named view computes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::aggregate::distribution::{BoxTable, Histogram, box_stats_by_group, histogram};
use crate::aggregate::gender::gender_distribution;
use crate::aggregate::group::{
    CrossTab, GroupCounts, GroupTotals, count_by_group, count_by_group_2d, sum_by_group, top_n,
};
use crate::domain::{GroupKey, LoanRecord, Scope, ValueKey, ViewKind};

/// Knobs shared by the views that need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewParams {
    pub top_n: usize,
    pub bins: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self { top_n: 10, bins: 20 }
    }
}

/// Aggregate payload of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewData {
    Totals(GroupTotals),
    Counts(GroupCounts),
    Cross(CrossTab),
    Boxes(BoxTable),
    TopHistogram { top: GroupTotals, histogram: Histogram },
}

impl ViewData {
    /// True when the view has nothing to show ("no data").
    pub fn is_empty(&self) -> bool {
        match self {
            ViewData::Totals(t) => t.is_empty(),
            ViewData::Counts(c) => c.is_empty(),
            ViewData::Cross(x) => x.is_empty(),
            ViewData::Boxes(b) => b.is_empty(),
            ViewData::TopHistogram { top, .. } => top.is_empty(),
        }
    }
}

/// A computed view plus what it was computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedView {
    pub kind: ViewKind,
    pub scope: Scope,
    /// Number of records the aggregate was computed from.
    pub records: usize,
    pub data: ViewData,
}

/// Compute one view over `records`.
pub fn compute_view(kind: ViewKind, scope: Scope, records: &[&LoanRecord], params: &ViewParams) -> ComputedView {
    let it = || records.iter().copied();

    let data = match kind {
        ViewKind::LoanByCountry => ViewData::Totals(sum_by_group(it(), GroupKey::Country, ValueKey::LoanAmount)),
        ViewKind::LoanBySector => ViewData::Totals(sum_by_group(it(), GroupKey::Sector, ValueKey::LoanAmount)),
        ViewKind::RepaymentIntervals => ViewData::Counts(count_by_group(it(), GroupKey::RepaymentInterval)),
        ViewKind::FundedByGender => {
            ViewData::Boxes(box_stats_by_group(it(), GroupKey::Gender, ValueKey::FundedAmount))
        }
        ViewKind::CountrySector => ViewData::Cross(count_by_group_2d(it(), GroupKey::Country, GroupKey::Sector)),
        ViewKind::LoanDistribution => {
            ViewData::Boxes(box_stats_by_group(it(), GroupKey::Country, ValueKey::LoanAmount))
        }
        ViewKind::GenderDistribution => ViewData::Counts(gender_distribution(it())),
        ViewKind::TopCountries => {
            let top = top_n(it(), GroupKey::Country, ValueKey::FundedAmount, params.top_n);
            let leaders: HashSet<&str> = top.entries.iter().map(|e| e.group.as_str()).collect();
            let histogram = histogram(
                it().filter(|r| leaders.contains(r.country.trim())),
                ValueKey::FundedAmount,
                params.bins,
                Some(GroupKey::Sector),
            );
            ViewData::TopHistogram { top, histogram }
        }
    };

    ComputedView {
        kind,
        scope,
        records: records.len(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn record(country: &str, sector: &str, funded: i64, genders: &str) -> LoanRecord {
        LoanRecord {
            id: None,
            country: country.to_string(),
            sector: sector.to_string(),
            loan_amount: Decimal::from(funded),
            funded_amount: Decimal::from(funded),
            repayment_interval: "monthly".to_string(),
            borrower_genders: genders.to_string(),
        }
    }

    fn records() -> Vec<LoanRecord> {
        vec![
            record("Kenya", "Food", 100, "female"),
            record("Peru", "Retail", 400, "female, male"),
            record("Chile", "Food", 50, "male"),
            record("Kenya", "Retail", 300, "female"),
        ]
    }

    #[test]
    fn every_view_computes_on_empty_input() {
        let params = ViewParams::default();
        for kind in ViewKind::ALL {
            let view = compute_view(kind, Scope::View, &[], &params);
            assert!(view.data.is_empty(), "{kind:?} should be empty");
            assert_eq!(view.records, 0);
        }
    }

    #[test]
    fn funded_by_gender_groups_whole_combinations() {
        let owned = records();
        let refs: Vec<&LoanRecord> = owned.iter().collect();
        let view = compute_view(ViewKind::FundedByGender, Scope::View, &refs, &ViewParams::default());
        let ViewData::Boxes(table) = view.data else {
            panic!("unexpected payload");
        };
        let groups: Vec<_> = table.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["female", "female, male", "male"]);
    }

    #[test]
    fn top_countries_histogram_only_covers_leaders() {
        let owned = records();
        let refs: Vec<&LoanRecord> = owned.iter().collect();
        let params = ViewParams { top_n: 2, bins: 3 };
        let view = compute_view(ViewKind::TopCountries, Scope::Dataset, &refs, &params);
        let ViewData::TopHistogram { top, histogram } = view.data else {
            panic!("unexpected payload");
        };
        assert_eq!(top.entries.len(), 2);
        assert_eq!(top.entries[0].group, "Kenya");
        assert_eq!(top.get("Kenya"), Some(Decimal::from(400)));
        // Chile (50) is not a leader, so only 3 records are binned.
        assert_eq!(histogram.total(), 3);
        assert_eq!(histogram.bins.len(), 3);
    }
}
