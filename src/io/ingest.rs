//! CSV ingest and validation.
//!
//! This module turns one or more loan-record CSV partitions into a single
//! immutable `Dataset`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: partitions are parsed in parallel but always
//!   concatenated in encounter order
//! - **Separation of concerns**: no filtering or aggregation here

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use csv::StringRecord;
use rayon::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::source::read_source;
use crate::domain::{DataSource, Dataset, LoanRecord, PartitionStats, RowError};

/// Columns every partition must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "country",
    "sector",
    "loan_amount",
    "funded_amount",
    "repayment_interval",
    "borrower_genders",
];

/// Failure to produce a dataset at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data sources were given")]
    NoSources,

    #[error("failed to open '{path}': {error}")]
    Open {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("failed to read CSV headers from '{source_name}': {error}")]
    Headers {
        source_name: String,
        #[source]
        error: csv::Error,
    },

    #[error("'{source_name}' is missing required column `{column}`")]
    MissingColumn { source_name: String, column: String },

    #[error("no valid rows remain after validation ({rows_read} row(s) read)")]
    NoValidRows { rows_read: usize },
}

impl LoadError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::NoValidRows { .. } => 3,
            LoadError::Fetch { .. } => 4,
            _ => 2,
        }
    }
}

/// One parsed partition: valid records plus what was dropped.
#[derive(Debug, Clone)]
pub struct Partition {
    pub records: Vec<LoanRecord>,
    pub stats: PartitionStats,
    pub row_errors: Vec<RowError>,
}

/// Load every source and concatenate the partitions in the given order.
pub fn load_dataset(sources: &[DataSource]) -> Result<Dataset, LoadError> {
    if sources.is_empty() {
        return Err(LoadError::NoSources);
    }

    // `collect` on an indexed parallel iterator preserves source order.
    let parsed: Vec<Result<Partition, LoadError>> = sources.par_iter().map(load_partition).collect();

    let mut records = Vec::new();
    let mut partitions = Vec::with_capacity(parsed.len());
    let mut row_errors = Vec::new();

    for partition in parsed {
        let partition = partition?;
        records.extend(partition.records);
        partitions.push(partition.stats);
        row_errors.extend(partition.row_errors);
    }

    let rows_read: usize = partitions.iter().map(|p| p.rows_read).sum();
    if records.is_empty() {
        return Err(LoadError::NoValidRows { rows_read });
    }

    info!(
        partitions = partitions.len(),
        rows_read,
        rows_used = records.len(),
        "dataset loaded"
    );
    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "rows dropped during validation");
    }

    Ok(Dataset::new(records, partitions, row_errors))
}

/// Read and parse a single source.
pub fn load_partition(source: &DataSource) -> Result<Partition, LoadError> {
    let reader = read_source(source)?;
    parse_partition(&source.name(), reader)
}

/// Parse CSV content into validated records.
pub fn parse_partition<R: Read>(source_name: &str, reader: R) -> Result<Partition, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|error| LoadError::Headers {
            source_name: source_name.to_string(),
            error,
        })?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(source_name, &header_map)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = match result {
            Ok(record) => parse_row(&record, &header_map),
            Err(e) => Err(format!("CSV parse error: {e}")),
        };

        match parsed {
            Ok(record) => records.push(record),
            Err(message) => row_errors.push(RowError {
                source: source_name.to_string(),
                line,
                message,
            }),
        }
    }

    debug!(
        source = source_name,
        rows_read,
        rows_used = records.len(),
        "partition parsed"
    );

    Ok(Partition {
        stats: PartitionStats {
            source: source_name.to_string(),
            rows_read,
            rows_used: records.len(),
        },
        records,
        row_errors,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(source_name: &str, header_map: &HashMap<String, usize>) -> Result<(), LoadError> {
    match REQUIRED_COLUMNS.iter().find(|c| !header_map.contains_key(**c)) {
        Some(column) => Err(LoadError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<LoanRecord, String> {
    let country = get_required(record, header_map, "country")?.to_string();
    let sector = get_required(record, header_map, "sector")?.to_string();
    let loan_amount = parse_amount(get_required(record, header_map, "loan_amount")?, "loan_amount")?;
    let funded_amount = parse_amount(get_required(record, header_map, "funded_amount")?, "funded_amount")?;

    let repayment_interval = get_optional(record, header_map, "repayment_interval")
        .unwrap_or_default()
        .to_string();
    let borrower_genders = get_optional(record, header_map, "borrower_genders")
        .unwrap_or_default()
        .to_string();
    let id = get_optional(record, header_map, "id").and_then(|s| s.parse::<u64>().ok());

    Ok(LoanRecord {
        id,
        country,
        sector,
        loan_amount,
        funded_amount,
        repayment_interval,
        borrower_genders,
    })
}

fn parse_amount(s: &str, name: &str) -> Result<Decimal, String> {
    let value = Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| format!("Invalid `{name}` value '{s}' (not a number)."))?;
    if value < Decimal::ZERO {
        return Err(format!("Invalid `{name}` value '{s}' (must be >= 0)."));
    }
    Ok(value)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,funded_amount,loan_amount,activity,sector,country,borrower_genders,repayment_interval\n";

    fn parse(body: &str) -> Partition {
        let csv = format!("{HEADER}{body}");
        parse_partition("part.csv", csv.as_bytes()).unwrap()
    }

    #[test]
    fn parses_kiva_shaped_rows() {
        let p = parse(
            "653051,300.0,300.0,Fruits & Vegetables,Food,Pakistan,female,irregular\n\
             653053,575.0,575.0,Rickshaw,Transportation,Pakistan,\"female, female\",irregular\n",
        );
        assert_eq!(p.records.len(), 2);
        assert!(p.row_errors.is_empty());

        let r = &p.records[1];
        assert_eq!(r.id, Some(653053));
        assert_eq!(r.sector, "Transportation");
        assert_eq!(r.loan_amount, Decimal::from(575));
        assert_eq!(r.borrower_genders, "female, female");
    }

    #[test]
    fn invalid_rows_are_reported_not_fatal() {
        let p = parse(
            "1,100,100,x,Food,,female,monthly\n\
             2,abc,100,x,Food,Kenya,female,monthly\n\
             3,100,-5,x,Food,Kenya,female,monthly\n\
             4,50,100,x,Retail,Kenya,,bullet\n",
        );
        assert_eq!(p.stats.rows_read, 4);
        assert_eq!(p.stats.rows_used, 1);
        assert_eq!(p.row_errors.len(), 3);
        assert_eq!(p.row_errors[0].line, 2);
        assert!(p.row_errors[0].message.contains("`country`"));
        assert!(p.row_errors[1].message.contains("not a number"));
        assert!(p.row_errors[2].message.contains(">= 0"));

        // Empty genders are allowed.
        assert_eq!(p.records[0].borrower_genders, "");
    }

    #[test]
    fn scientific_amounts_are_accepted() {
        let p = parse("1,1.5e3,2e3,x,Food,Kenya,male,monthly\n");
        assert_eq!(p.records[0].funded_amount, Decimal::from(1500));
        assert_eq!(p.records[0].loan_amount, Decimal::from(2000));
    }

    #[test]
    fn headers_are_case_insensitive_and_bom_tolerant() {
        let csv = "\u{feff}Country,SECTOR,Loan_Amount,funded_amount,repayment_interval,borrower_genders\n\
                   Kenya,Food,100,100,monthly,female\n";
        let p = parse_partition("bom.csv", csv.as_bytes()).unwrap();
        assert_eq!(p.records.len(), 1);
        assert_eq!(p.records[0].country, "Kenya");
        assert_eq!(p.records[0].id, None);
    }

    #[test]
    fn missing_column_is_a_load_failure() {
        let csv = "country,sector,loan_amount,funded_amount,borrower_genders\nKenya,Food,1,1,female\n";
        let err = parse_partition("short.csv", csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "repayment_interval"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_dataset_requires_sources() {
        assert!(matches!(load_dataset(&[]), Err(LoadError::NoSources)));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_dataset(&[DataSource::parse("does/not/exist.csv")]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
