//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the filter and aggregation engines
//! - exported to JSON/CSV
//! - reloaded later by `kiva show`

use std::borrow::Cow;
use std::path::PathBuf;

use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::criteria::FilterCriteria;

/// One loan entry.
///
/// Amounts are exact decimals so group sums never lose cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Source `id` column, when the partition carries one.
    pub id: Option<u64>,
    pub country: String,
    pub sector: String,
    pub loan_amount: Decimal,
    pub funded_amount: Decimal,
    pub repayment_interval: String,
    /// Raw borrower genders, possibly a comma-separated list for group loans
    /// (e.g. `"female, female, male"`).
    pub borrower_genders: String,
}

impl LoanRecord {
    /// True when the record satisfies the load-time invariants
    /// (non-empty country/sector, non-negative amounts).
    pub fn is_well_formed(&self) -> bool {
        !self.country.trim().is_empty()
            && !self.sector.trim().is_empty()
            && self.loan_amount >= Decimal::ZERO
            && self.funded_amount >= Decimal::ZERO
    }

    /// The record's value for a grouping key, or `None` when that key is empty.
    ///
    /// `GroupKey::Gender` yields the whole normalized genders list
    /// (`"Female, MALE "` -> `"female, male"`).
    pub fn group_value(&self, key: GroupKey) -> Option<Cow<'_, str>> {
        let value = match key {
            GroupKey::Country => Cow::Borrowed(self.country.trim()),
            GroupKey::Sector => Cow::Borrowed(self.sector.trim()),
            GroupKey::RepaymentInterval => Cow::Borrowed(self.repayment_interval.trim()),
            GroupKey::Gender => Cow::Owned(normalize_genders(&self.borrower_genders)),
        };
        if value.is_empty() { None } else { Some(value) }
    }

    pub fn value(&self, key: ValueKey) -> Decimal {
        match key {
            ValueKey::LoanAmount => self.loan_amount,
            ValueKey::FundedAmount => self.funded_amount,
        }
    }

    /// Normalized per-borrower gender tokens (one per borrower).
    pub fn gender_tokens(&self) -> Vec<String> {
        gender_tokens(&self.borrower_genders)
    }
}

/// Split a genders field into trimmed, lower-cased, non-empty tokens.
pub fn gender_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Canonical form of a genders field: its tokens joined by `", "`.
pub fn normalize_genders(raw: &str) -> String {
    gender_tokens(raw).join(", ")
}

/// Categorical attribute used to group records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKey {
    Country,
    Sector,
    RepaymentInterval,
    /// Whole normalized `borrower_genders` value (one group per combination).
    Gender,
}

impl GroupKey {
    pub fn label(self) -> &'static str {
        match self {
            GroupKey::Country => "country",
            GroupKey::Sector => "sector",
            GroupKey::RepaymentInterval => "repayment_interval",
            GroupKey::Gender => "borrower_genders",
        }
    }
}

/// Numeric attribute used for sums and distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKey {
    LoanAmount,
    FundedAmount,
}

impl ValueKey {
    pub fn label(self) -> &'static str {
        match self {
            ValueKey::LoanAmount => "loan_amount",
            ValueKey::FundedAmount => "funded_amount",
        }
    }
}

/// The fixed catalog of dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Sum of loan amount per country.
    LoanByCountry,
    /// Sum of loan amount per sector.
    LoanBySector,
    /// Number of loans per repayment interval.
    RepaymentIntervals,
    /// Funded amount five-number summary per genders combination.
    FundedByGender,
    /// Number of loans per country and sector (stacked, normalized per country).
    CountrySector,
    /// Loan amount five-number summary per country.
    LoanDistribution,
    /// Borrowers per gender (one unit per borrower).
    GenderDistribution,
    /// Top countries by funded amount, with a funded-amount histogram stacked by sector.
    TopCountries,
}

impl ViewKind {
    pub const ALL: [ViewKind; 8] = [
        ViewKind::LoanByCountry,
        ViewKind::LoanBySector,
        ViewKind::RepaymentIntervals,
        ViewKind::FundedByGender,
        ViewKind::CountrySector,
        ViewKind::LoanDistribution,
        ViewKind::GenderDistribution,
        ViewKind::TopCountries,
    ];

    /// Human-readable title for terminal output.
    pub fn title(self) -> &'static str {
        match self {
            ViewKind::LoanByCountry => "Loan Amount by Country",
            ViewKind::LoanBySector => "Loan Amount by Sector",
            ViewKind::RepaymentIntervals => "Repayment Interval Distribution",
            ViewKind::FundedByGender => "Funded Amount by Gender",
            ViewKind::CountrySector => "Number of Loans by Country and Sector",
            ViewKind::LoanDistribution => "Distribution of Loan Amounts by Country",
            ViewKind::GenderDistribution => "Loan Distribution by Gender",
            ViewKind::TopCountries => "Funded Amounts in Top Countries by Sector",
        }
    }
}

/// Which record set a view is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The filtered view produced from the current criteria.
    View,
    /// The whole loaded dataset.
    Dataset,
}

/// Terminal output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Where a partition is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// Interpret a raw source string: `http(s)://` prefixes are URLs, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DataSource::Url(raw.to_string())
        } else {
            DataSource::File(PathBuf::from(raw))
        }
    }

    /// Short name used in row errors and summaries.
    pub fn name(&self) -> String {
        match self {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Url(url) => url.clone(),
        }
    }
}

/// A row that failed validation during load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub source: String,
    pub line: usize,
    pub message: String,
}

/// Per-partition load statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub source: String,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// The loaded dataset: all partitions concatenated in encounter order.
///
/// Records are never mutated after construction; filtered views borrow them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<LoanRecord>,
    partitions: Vec<PartitionStats>,
    row_errors: Vec<RowError>,
}

impl Dataset {
    pub fn new(records: Vec<LoanRecord>, partitions: Vec<PartitionStats>, row_errors: Vec<RowError>) -> Self {
        Self {
            records,
            partitions,
            row_errors,
        }
    }

    /// Build a single-partition dataset from in-memory records.
    pub fn from_records(records: Vec<LoanRecord>) -> Self {
        let stats = PartitionStats {
            source: "memory".to_string(),
            rows_read: records.len(),
            rows_used: records.len(),
        };
        Self::new(records, vec![stats], Vec::new())
    }

    pub fn records(&self) -> &[LoanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn partitions(&self) -> &[PartitionStats] {
        &self.partitions
    }

    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    pub fn rows_read(&self) -> usize {
        self.partitions.iter().map(|p| p.rows_read).sum()
    }

    /// Rows dropped at load time for violating the record invariants.
    pub fn rows_skipped(&self) -> usize {
        self.partitions.iter().map(|p| p.rows_read - p.rows_used).sum()
    }

    /// Distinct values of a key in first-encounter order (the options a UI would list).
    pub fn distinct(&self, key: GroupKey) -> Vec<String> {
        distinct_values(self.records.iter(), key)
    }

    /// The first `n` records.
    pub fn head(&self, n: usize) -> &[LoanRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Distinct non-empty values of `key` in first-encounter order.
pub fn distinct_values<'a>(records: impl IntoIterator<Item = &'a LoanRecord>, key: GroupKey) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for record in records {
        if let Some(value) = record.group_value(key) {
            if seen.insert(value.to_string()) {
                out.push(value.into_owned());
            }
        }
    }
    out
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment and defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: Vec<DataSource>,
    pub criteria: FilterCriteria,
    pub scope: Scope,
    pub top_n: usize,
    pub bins: usize,
    pub preview_rows: usize,
    pub format: OutputFormat,

    pub export_csv: Option<PathBuf>,
    pub save_json: Option<PathBuf>,
    /// Write a markdown debug bundle under `debug/`.
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, genders: &str) -> LoanRecord {
        LoanRecord {
            id: None,
            country: country.to_string(),
            sector: "Food".to_string(),
            loan_amount: Decimal::from(100),
            funded_amount: Decimal::from(75),
            repayment_interval: "monthly".to_string(),
            borrower_genders: genders.to_string(),
        }
    }

    #[test]
    fn gender_tokens_are_trimmed_and_lowercased() {
        assert_eq!(gender_tokens("female, Female ,MALE "), vec!["female", "female", "male"]);
        assert!(gender_tokens("").is_empty());
        assert!(gender_tokens(" , ").is_empty());
        assert_eq!(normalize_genders(" Male"), "male");
    }

    #[test]
    fn empty_group_values_are_none() {
        let r = record("Kenya", "");
        assert_eq!(r.group_value(GroupKey::Country).as_deref(), Some("Kenya"));
        assert_eq!(r.group_value(GroupKey::Gender), None);

        let mut r = record("Kenya", "female");
        r.repayment_interval = "  ".to_string();
        assert_eq!(r.group_value(GroupKey::RepaymentInterval), None);
    }

    #[test]
    fn well_formed_checks_categories_and_amounts() {
        assert!(record("Peru", "female").is_well_formed());
        assert!(!record(" ", "female").is_well_formed());

        let mut r = record("Peru", "female");
        r.funded_amount = Decimal::from(-1);
        assert!(!r.is_well_formed());
    }

    #[test]
    fn distinct_keeps_first_encounter_order() {
        let ds = Dataset::from_records(vec![
            record("Peru", "female"),
            record("Kenya", "male"),
            record("Peru", "male"),
            record("Chile", "female"),
        ]);
        assert_eq!(ds.distinct(GroupKey::Country), vec!["Peru", "Kenya", "Chile"]);
        assert_eq!(ds.head(2).len(), 2);
        assert_eq!(ds.head(10).len(), 4);
        assert_eq!(ds.rows_skipped(), 0);
    }

    #[test]
    fn data_source_parse() {
        assert_eq!(
            DataSource::parse("https://example.org/a.csv"),
            DataSource::Url("https://example.org/a.csv".to_string())
        );
        assert_eq!(DataSource::parse("data/a.csv"), DataSource::File(PathBuf::from("data/a.csv")));
    }
}
