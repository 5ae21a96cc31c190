//! Read/write saved view JSON files.
//!
//! A saved view is the "portable" representation of one dashboard panel:
//! - the computed aggregate payload
//! - the criteria and sources it was computed from
//! - when it was generated
//!
//! `kiva show --file <json>` re-prints it without reloading the dataset.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::ComputedView;
use crate::domain::{DataSource, FilterCriteria};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<DataSource>,
    pub criteria: FilterCriteria,
    pub view: ComputedView,
}

impl ViewFile {
    pub fn new(view: ComputedView, criteria: FilterCriteria, sources: Vec<DataSource>) -> Self {
        Self {
            tool: "kiva".to_string(),
            generated_at: Utc::now(),
            sources,
            criteria,
            view,
        }
    }
}

/// Write a saved view JSON file.
pub fn write_view_json(path: &Path, file: &ViewFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create view JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file).map_err(|e| AppError::new(4, format!("Failed to write view JSON: {e}")))
}

/// Read a saved view JSON file.
pub fn read_view_json(path: &Path) -> Result<ViewFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open view JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid view JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::aggregate::{GroupTotal, GroupTotals, ViewData, ViewParams, compute_view};
    use crate::domain::{GroupKey, LoanRecord, Scope, ValueKey, ViewKind};

    #[test]
    fn saved_view_reads_back() {
        let records = vec![LoanRecord {
            id: Some(1),
            country: "Kenya".to_string(),
            sector: "Food".to_string(),
            loan_amount: Decimal::from(125),
            funded_amount: Decimal::from(100),
            repayment_interval: "monthly".to_string(),
            borrower_genders: "female, male".to_string(),
        }];
        let refs: Vec<&LoanRecord> = records.iter().collect();
        let view = compute_view(ViewKind::CountrySector, Scope::View, &refs, &ViewParams::default());
        let file = ViewFile::new(
            view,
            FilterCriteria::new().with_country("Kenya"),
            vec![DataSource::parse("part_0.csv")],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        write_view_json(&path, &file).unwrap();
        let back = read_view_json(&path).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn large_totals_keep_every_digit() {
        let total = Decimal::from_str_exact("12345678901234567.89").unwrap();
        let view = ComputedView {
            kind: ViewKind::LoanByCountry,
            scope: Scope::View,
            records: 1,
            data: ViewData::Totals(GroupTotals {
                group_key: GroupKey::Country,
                value_key: ValueKey::LoanAmount,
                entries: vec![GroupTotal {
                    group: "Kenya".to_string(),
                    total,
                }],
                skipped: 0,
            }),
        };
        let file = ViewFile::new(view, FilterCriteria::new().with_country("Kenya"), Vec::new());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        write_view_json(&path, &file).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("12345678901234567.89"));

        let back = read_view_json(&path).unwrap();
        assert_eq!(back, file);
        let ViewData::Totals(totals) = back.view.data else {
            panic!("unexpected payload");
        };
        assert_eq!(totals.get("Kenya"), Some(total));
    }

    #[test]
    fn garbage_is_rejected_with_input_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_view_json(&path).unwrap_err().exit_code(), 2);
    }
}
