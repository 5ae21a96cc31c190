//! Synthetic Kiva-shaped loan partitions for demos and tests.
//!
//! Output is fully determined by the seed, so golden comparisons stay stable.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::LoanRecord;
use crate::error::AppError;

/// Kiva lends in multiples of this amount.
const LOAN_STEP: f64 = 25.0;
const MAX_LOAN: f64 = 50_000.0;
/// Median loan size of the generated sample.
const MEDIAN_LOAN: f64 = 500.0;
const LOAN_SIGMA: f64 = 0.9;
/// Share of loans that end up fully funded.
const FULLY_FUNDED: f64 = 0.92;

const COUNTRIES: [(&str, u32); 12] = [
    ("Philippines", 160),
    ("Kenya", 75),
    ("El Salvador", 39),
    ("Cambodia", 34),
    ("Pakistan", 26),
    ("Peru", 22),
    ("Colombia", 21),
    ("Uganda", 20),
    ("Tajikistan", 19),
    ("Ecuador", 13),
    ("Nicaragua", 11),
    ("Kyrgyzstan", 7),
];

const SECTORS: [(&str, u32); 12] = [
    ("Agriculture", 180),
    ("Food", 136),
    ("Retail", 124),
    ("Services", 45),
    ("Personal Use", 36),
    ("Housing", 33),
    ("Clothing", 32),
    ("Education", 31),
    ("Transportation", 15),
    ("Arts", 12),
    ("Health", 9),
    ("Construction", 6),
];

const INTERVALS: [(&str, u32); 4] = [("monthly", 510), ("irregular", 380), ("bullet", 109), ("weekly", 1)];

/// Parameters for `kiva sample`.
#[derive(Debug, Clone, Copy)]
pub struct SampleSpec {
    pub rows: usize,
    pub partitions: usize,
    pub seed: u64,
}

/// Generate `spec.rows` records.
pub fn generate_records(spec: &SampleSpec) -> Result<Vec<LoanRecord>, AppError> {
    if spec.rows == 0 {
        return Err(AppError::new(2, "Sample row count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let countries = weighted(&COUNTRIES)?;
    let sectors = weighted(&SECTORS)?;
    let intervals = weighted(&INTERVALS)?;
    let amounts = LogNormal::new(MEDIAN_LOAN.ln(), LOAN_SIGMA)
        .map_err(|e| AppError::new(4, format!("Amount distribution error: {e}")))?;

    let mut out = Vec::with_capacity(spec.rows);
    for i in 0..spec.rows {
        let loan = round_to_step(amounts.sample(&mut rng).min(MAX_LOAN));
        let funded = if rng.gen_bool(FULLY_FUNDED) {
            loan
        } else {
            round_down_to_step(loan * rng.gen_range(0.0..1.0))
        };

        out.push(LoanRecord {
            id: Some(653_000 + i as u64),
            country: COUNTRIES[countries.sample(&mut rng)].0.to_string(),
            sector: SECTORS[sectors.sample(&mut rng)].0.to_string(),
            loan_amount: Decimal::from(loan as i64),
            funded_amount: Decimal::from(funded as i64),
            repayment_interval: INTERVALS[intervals.sample(&mut rng)].0.to_string(),
            borrower_genders: sample_genders(&mut rng),
        });
    }
    Ok(out)
}

/// Generate records and write them as `kiva_loans_part_{i}.csv` files under `dir`.
pub fn write_partitions(dir: &Path, spec: &SampleSpec) -> Result<Vec<PathBuf>, AppError> {
    if spec.partitions == 0 {
        return Err(AppError::new(2, "Sample partition count must be > 0."));
    }
    let records = generate_records(spec)?;

    create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", dir.display())))?;

    let chunk = records.len().div_ceil(spec.partitions).max(1);
    let mut paths = Vec::with_capacity(spec.partitions);
    for (idx, part) in records.chunks(chunk).enumerate() {
        let path = dir.join(format!("kiva_loans_part_{idx}.csv"));
        write_partition(&path, part)?;
        paths.push(path);
    }

    info!(rows = records.len(), partitions = paths.len(), dir = %dir.display(), "sample written");
    Ok(paths)
}

fn write_partition(path: &Path, records: &[LoanRecord]) -> Result<(), AppError> {
    let io_err = |e: csv::Error| AppError::new(4, format!("Failed to write '{}': {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer
        .write_record([
            "id",
            "funded_amount",
            "loan_amount",
            "sector",
            "country",
            "borrower_genders",
            "repayment_interval",
        ])
        .map_err(io_err)?;

    for r in records {
        writer
            .write_record([
                r.id.map(|id| id.to_string()).unwrap_or_default(),
                r.funded_amount.to_string(),
                r.loan_amount.to_string(),
                r.sector.clone(),
                r.country.clone(),
                r.borrower_genders.clone(),
                r.repayment_interval.clone(),
            ])
            .map_err(io_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))
}

fn weighted(table: &[(&str, u32)]) -> Result<WeightedIndex<u32>, AppError> {
    WeightedIndex::new(table.iter().map(|(_, w)| *w))
        .map_err(|e| AppError::new(4, format!("Invalid sample weights: {e}")))
}

/// Single borrowers most of the time; group loans list one token per borrower.
fn sample_genders(rng: &mut StdRng) -> String {
    let roll: f64 = rng.r#gen();
    if roll < 0.01 {
        return String::new();
    }
    if roll < 0.65 {
        return "female".to_string();
    }
    if roll < 0.85 {
        return "male".to_string();
    }

    let n = rng.gen_range(2..=6);
    let tokens: Vec<&str> = (0..n)
        .map(|_| if rng.gen_bool(0.8) { "female" } else { "male" })
        .collect();
    tokens.join(", ")
}

fn round_to_step(v: f64) -> f64 {
    ((v / LOAN_STEP).round() * LOAN_STEP).max(LOAN_STEP)
}

fn round_down_to_step(v: f64) -> f64 {
    (v / LOAN_STEP).floor() * LOAN_STEP
}
