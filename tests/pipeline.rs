//! End-to-end: partitions on disk -> dataset -> filter -> views -> saved files.

use std::fs;
use std::path::Path;

use kiva_board::aggregate::ViewData;
use kiva_board::app::pipeline::run_views;
use kiva_board::data::{SampleSpec, write_partitions};
use kiva_board::domain::{DataSource, FilterCriteria, OutputFormat, RunConfig, Scope, ViewKind};
use kiva_board::filter::{BlockReason, apply};
use kiva_board::io::{ViewFile, load_dataset, read_view_json, write_view_csv, write_view_json};
use rust_decimal::Decimal;

const PART_A: &str = "\u{feff}id,Country,sector,loan_amount,funded_amount,repayment_interval,borrower_genders
1,Kenya,Food,100,100,monthly,female
2,Kenya,Retail,300,250,irregular,\"female, male\"
3,,Food,50,50,monthly,male
";

const PART_B: &str = "loan_amount,funded_amount,country,sector,repayment_interval,borrower_genders
200,200,Peru,Food,monthly,male
abc,10,Peru,Food,monthly,male
450,450,\"Congo, The Democratic Republic of the\",Food,bullet,female
";

fn write(dir: &Path, name: &str, body: &str) -> DataSource {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    DataSource::File(path)
}

fn config(criteria: FilterCriteria, scope: Scope) -> RunConfig {
    RunConfig {
        sources: Vec::new(),
        criteria,
        scope,
        top_n: 2,
        bins: 4,
        preview_rows: 5,
        format: OutputFormat::Table,
        export_csv: None,
        save_json: None,
        debug: false,
    }
}

#[test]
fn partitions_load_in_order_with_row_errors() {
    let dir = tempfile::tempdir().unwrap();
    let sources = vec![write(dir.path(), "a.csv", PART_A), write(dir.path(), "b.csv", PART_B)];

    let dataset = load_dataset(&sources).unwrap();
    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.rows_read(), 6);
    assert_eq!(dataset.rows_skipped(), 2);
    assert_eq!(dataset.row_errors().len(), 2);

    let countries = dataset.distinct(kiva_board::domain::GroupKey::Country);
    assert_eq!(countries, vec!["Kenya", "Peru", "Congo, The Democratic Republic of the"]);
}

#[test]
fn filter_and_views_over_loaded_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let sources = vec![write(dir.path(), "a.csv", PART_A), write(dir.path(), "b.csv", PART_B)];
    let dataset = load_dataset(&sources).unwrap();

    assert_eq!(
        apply(&dataset, &FilterCriteria::new()).blocked(),
        Some(BlockReason::NoCategorySelected)
    );

    let criteria = FilterCriteria::new().with_sector("Food");
    let run = run_views(&dataset, &config(criteria, Scope::View), &ViewKind::ALL);
    let view = run.outcome.view().unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(view.offered_intervals(), ["monthly", "bullet"]);
    assert_eq!(run.views.len(), ViewKind::ALL.len());

    let ViewData::Totals(by_country) = &run.views[0].data else {
        panic!("loan-by-country should be totals");
    };
    assert_eq!(by_country.get("Kenya"), Some(Decimal::from(100)));
    assert_eq!(by_country.grand_total(), Some(Decimal::from(750)));

    let criteria = FilterCriteria::new().with_sector("Food").with_intervals(["bullet"]);
    let run = run_views(&dataset, &config(criteria, Scope::View), &[ViewKind::GenderDistribution]);
    let ViewData::Counts(genders) = &run.views[0].data else {
        panic!("gender distribution should be counts");
    };
    assert_eq!(genders.get("female"), Some(1));
    assert_eq!(genders.total(), 1);
}

#[test]
fn saved_and_exported_views() {
    let dir = tempfile::tempdir().unwrap();
    let sources = vec![write(dir.path(), "a.csv", PART_A), write(dir.path(), "b.csv", PART_B)];
    let dataset = load_dataset(&sources).unwrap();

    let criteria = FilterCriteria::new().with_country("Kenya");
    let run = run_views(&dataset, &config(criteria.clone(), Scope::View), &[ViewKind::LoanBySector]);
    let view = &run.views[0];

    let csv_path = dir.path().join("sector.csv");
    write_view_csv(&csv_path, view).unwrap();
    assert_eq!(
        fs::read_to_string(&csv_path).unwrap(),
        "sector,sum_loan_amount\nFood,100\nRetail,300\n"
    );

    let json_path = dir.path().join("sector.json");
    write_view_json(&json_path, &ViewFile::new(view.clone(), criteria, sources)).unwrap();
    let saved = read_view_json(&json_path).unwrap();
    assert_eq!(&saved.view, view);
}

#[test]
fn sample_partitions_round_trip_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let spec = SampleSpec {
        rows: 300,
        partitions: 3,
        seed: 7,
    };
    let paths = write_partitions(dir.path(), &spec).unwrap();
    assert_eq!(paths.len(), 3);

    let sources: Vec<DataSource> = paths.into_iter().map(DataSource::File).collect();
    let dataset = load_dataset(&sources).unwrap();
    assert_eq!(dataset.len(), 300);
    assert_eq!(dataset.rows_skipped(), 0);

    let sector = dataset.records()[0].sector.clone();
    let run = run_views(
        &dataset,
        &config(FilterCriteria::new().with_sector(sector.clone()), Scope::View),
        &[ViewKind::LoanBySector],
    );
    let ViewData::Totals(totals) = &run.views[0].data else {
        panic!("loan-by-sector should be totals");
    };
    assert_eq!(totals.entries.len(), 1);
    assert_eq!(totals.entries[0].group, sector);
}
