//! User filter criteria.
//!
//! A `FilterCriteria` is built fresh for every interaction and never mutated
//! afterwards; the builder methods consume and return `self`.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive loan-amount range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountRange {
    /// Build a range; bounds given in the wrong order are swapped.
    pub fn new(a: Decimal, b: Decimal) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Repayment-interval selection.
///
/// The default offers every interval present in the current view, pre-selected.
/// An explicit empty selection means the user deselected all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "values", rename_all = "kebab-case")]
pub enum IntervalSelection {
    #[default]
    AllOffered,
    Only(BTreeSet<String>),
}

/// Filter constraints. Empty category sets and missing bounds do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub countries: BTreeSet<String>,
    pub sectors: BTreeSet<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub intervals: IntervalSelection,
}

impl FilterCriteria {
    /// Creates criteria with no constraints (which the filter engine blocks on).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.countries.insert(country.into());
        self
    }

    #[must_use]
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries.extend(countries.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sectors.insert(sector.into());
        self
    }

    #[must_use]
    pub fn with_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors.extend(sectors.into_iter().map(Into::into));
        self
    }

    /// Constrain `loan_amount` to `[min, max]` (inclusive, swapped if reversed).
    #[must_use]
    pub fn with_amount_range(mut self, min: Decimal, max: Decimal) -> Self {
        let range = AmountRange::new(min, max);
        self.min_amount = Some(range.min);
        self.max_amount = Some(range.max);
        self
    }

    #[must_use]
    pub fn with_min_amount(mut self, min: Decimal) -> Self {
        self.min_amount = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_amount(mut self, max: Decimal) -> Self {
        self.max_amount = Some(max);
        self
    }

    /// Select exactly these repayment intervals.
    #[must_use]
    pub fn with_intervals<I, S>(mut self, intervals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intervals = IntervalSelection::Only(intervals.into_iter().map(Into::into).collect());
        self
    }

    /// Deselect every repayment interval.
    #[must_use]
    pub fn without_intervals(mut self) -> Self {
        self.intervals = IntervalSelection::Only(BTreeSet::new());
        self
    }

    /// True when at least one country or sector is selected.
    pub fn has_category(&self) -> bool {
        !self.countries.is_empty() || !self.sectors.is_empty()
    }

    pub fn matches_country(&self, country: &str) -> bool {
        self.countries.is_empty() || self.countries.contains(country)
    }

    pub fn matches_sector(&self, sector: &str) -> bool {
        self.sectors.is_empty() || self.sectors.contains(sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive_and_ordered() {
        let r = AmountRange::new(Decimal::from(500), Decimal::from(100));
        assert_eq!(r.min, Decimal::from(100));
        assert!(r.contains(Decimal::from(100)));
        assert!(r.contains(Decimal::from(500)));
        assert!(!r.contains(Decimal::new(5001, 1)));
    }

    #[test]
    fn empty_sets_pass_everything() {
        let c = FilterCriteria::new().with_sector("Food");
        assert!(c.has_category());
        assert!(c.matches_country("Kenya"));
        assert!(c.matches_sector("Food"));
        assert!(!c.matches_sector("Retail"));
        assert!(!FilterCriteria::new().has_category());
    }

    #[test]
    fn interval_selection_variants() {
        assert_eq!(FilterCriteria::new().intervals, IntervalSelection::AllOffered);
        let c = FilterCriteria::new().with_intervals(["monthly", "bullet"]);
        match &c.intervals {
            IntervalSelection::Only(set) => assert_eq!(set.len(), 2),
            other => panic!("unexpected selection: {other:?}"),
        }
        let c = c.without_intervals();
        assert_eq!(c.intervals, IntervalSelection::Only(BTreeSet::new()));
    }

    #[test]
    fn criteria_round_trip_through_json() {
        let c = FilterCriteria::new()
            .with_country("Kenya")
            .with_amount_range(Decimal::from(25), Decimal::from(1000))
            .with_intervals(["monthly"]);
        let json = serde_json::to_string(&c).unwrap();
        let back: FilterCriteria = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
