//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the filter/aggregate engines stay clean and testable
//! - output changes are localized

use rust_decimal::Decimal;

use crate::aggregate::{BoxTable, ComputedView, CrossTab, GroupCounts, GroupTotals, Histogram, ViewData, to_f64};
use crate::domain::{Dataset, FilterCriteria, GroupKey, IntervalSelection, LoanRecord, Scope};
use crate::filter::{BlockReason, FilterOutcome};

const BAR_WIDTH: usize = 30;
const OPTION_LIST_MAX: usize = 12;
const ROW_ERRORS_SHOWN: usize = 5;

pub const NO_DATA: &str = "No data for the current selection.";

/// Format the load summary: partitions, skipped rows, preview, and the option lists.
pub fn format_dataset_summary(dataset: &Dataset, preview_rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== kiva - Dataset ===\n");
    out.push_str(&format!(
        "Records: n={} | rows read={} | skipped={}\n",
        dataset.len(),
        dataset.rows_read(),
        dataset.rows_skipped()
    ));

    out.push_str("\nPartitions:\n");
    out.push_str(&format!("{:<40} {:>10} {:>10}", "source", "rows_read", "rows_used").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<40} {:-<10} {:-<10}", "", "", ""));
    out.push('\n');
    for p in dataset.partitions() {
        out.push_str(&format!("{:<40} {:>10} {:>10}", truncate(&p.source, 40), p.rows_read, p.rows_used));
        out.push('\n');
    }

    let errors = dataset.row_errors();
    if !errors.is_empty() {
        out.push_str(&format!("\nSkipped rows (showing {} of {}):\n", errors.len().min(ROW_ERRORS_SHOWN), errors.len()));
        for e in errors.iter().take(ROW_ERRORS_SHOWN) {
            out.push_str(&format!("- {}:{} {}\n", e.source, e.line, e.message));
        }
    }

    if preview_rows > 0 {
        let head: Vec<&LoanRecord> = dataset.head(preview_rows).iter().collect();
        out.push_str(&format!("\nPreview (first {}):\n", head.len()));
        out.push_str(&format_records_table(&head));
    }

    out.push_str("\nOptions:\n");
    for (key, label) in [
        (GroupKey::Country, "countries"),
        (GroupKey::Sector, "sectors"),
        (GroupKey::RepaymentInterval, "repayment intervals"),
    ] {
        let values = dataset.distinct(key);
        out.push_str(&format!("- {label} ({}): {}\n", values.len(), fmt_list(&values, OPTION_LIST_MAX)));
    }

    out
}

/// Format the outcome of applying criteria: effective range, offered intervals, and a preview.
pub fn format_filter_summary(criteria: &FilterCriteria, outcome: &FilterOutcome<'_>, preview_rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== kiva - Filter ===\n");
    out.push_str(&format!("Criteria: {}\n", fmt_criteria(criteria)));

    let view = match outcome {
        FilterOutcome::Blocked(reason) => {
            out.push('\n');
            out.push_str(&format_blocked(*reason));
            return out;
        }
        FilterOutcome::Ready(view) => view,
    };

    match view.amount_range() {
        Some(range) => out.push_str(&format!(
            "Amount range: {} .. {}\n",
            fmt_amount(range.min),
            fmt_amount(range.max)
        )),
        None => out.push_str("Amount range: - (no records match the selected categories)\n"),
    }
    out.push_str(&format!(
        "Offered intervals: {}\n",
        fmt_list(view.offered_intervals(), OPTION_LIST_MAX)
    ));
    out.push_str(&format!("Records: n={}\n", view.len()));
    if view.skipped() > 0 {
        out.push_str(&format!("Skipped malformed records: {}\n", view.skipped()));
    }

    if view.is_empty() {
        out.push_str(&format!("\n{NO_DATA}\n"));
    } else if preview_rows > 0 {
        let head = &view.records()[..view.len().min(preview_rows)];
        out.push_str(&format!("\nPreview (first {}):\n", head.len()));
        out.push_str(&format_records_table(head));
    }

    out
}

/// Prompt printed in place of any output while the pipeline is blocked.
pub fn format_blocked(reason: BlockReason) -> String {
    format!("{}\n", reason.prompt())
}

/// Format one dashboard view.
pub fn format_view(view: &ComputedView) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", view.kind.title()));
    let scope = match view.scope {
        Scope::View => "filtered view",
        Scope::Dataset => "whole dataset",
    };
    out.push_str(&format!("Scope: {scope} | records={}\n", view.records));

    if view.data.is_empty() {
        out.push_str(NO_DATA);
        out.push('\n');
        return out;
    }

    out.push('\n');
    match &view.data {
        ViewData::Totals(totals) => out.push_str(&format_totals(totals)),
        ViewData::Counts(counts) => out.push_str(&format_counts(counts)),
        ViewData::Cross(tab) => out.push_str(&format_cross(tab)),
        ViewData::Boxes(table) => out.push_str(&format_boxes(table)),
        ViewData::TopHistogram { top, histogram } => {
            out.push_str(&format!("Top {} countries by {}:\n", top.len(), top.value_key.label()));
            out.push_str(&format_totals(top));
            out.push_str("\nHistogram:\n");
            out.push_str(&format_histogram(histogram));
        }
    }

    out
}

fn format_totals(totals: &GroupTotals) -> String {
    let mut out = String::new();
    // Shares are display-only, so an overflowing grand total falls back to f64.
    let grand = match totals.grand_total() {
        Some(total) => to_f64(total),
        None => totals.entries.iter().map(|e| to_f64(e.total)).sum(),
    };

    let sum_label = format!("sum_{}", totals.value_key.label());
    out.push_str(&format!("{:<28} {:>16} {:>7}", totals.group_key.label(), sum_label, "share").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<28} {:-<16} {:-<7}", "", "", ""));
    out.push('\n');

    for e in &totals.entries {
        let share = if grand > 0.0 { to_f64(e.total) / grand } else { 0.0 };
        out.push_str(
            format!(
                "{:<28} {:>16} {:>6.1}% {}",
                truncate(&e.group, 28),
                fmt_amount(e.total),
                share * 100.0,
                bar(share)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.push_str(&skipped_note(totals.skipped));

    out
}

fn format_counts(counts: &GroupCounts) -> String {
    let mut out = String::new();

    out.push_str(&format!("{:<28} {:>10} {:>7}", counts.label, "count", "share").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<28} {:-<10} {:-<7}", "", "", ""));
    out.push('\n');

    for e in &counts.entries {
        let share = counts.share(&e.group).unwrap_or(0.0);
        out.push_str(
            format!(
                "{:<28} {:>10} {:>6.1}% {}",
                truncate(&e.group, 28),
                e.count,
                share * 100.0,
                bar(share)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.push_str(&skipped_note(counts.skipped));

    out
}

fn format_cross(tab: &CrossTab) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:<24} {:<20} {:>8} {:>7}",
            tab.key_a.label(),
            tab.key_b.label(),
            "count",
            "share"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!("{:-<24} {:-<20} {:-<8} {:-<7}", "", "", "", ""));
    out.push('\n');

    for total in &tab.totals {
        for (i, cell) in tab.row(&total.group).enumerate() {
            let a = if i == 0 { truncate(&cell.a, 24) } else { String::new() };
            out.push_str(&format!(
                "{:<24} {:<20} {:>8} {:>6.1}%\n",
                a,
                truncate(&cell.b, 20),
                cell.count,
                tab.share(&cell.a, &cell.b) * 100.0
            ));
        }
        out.push_str(&format!("{:<24} {:<20} {:>8}\n", "", "(total)", total.count));
    }
    out.push_str(&skipped_note(tab.skipped));

    out
}

fn format_boxes(table: &BoxTable) -> String {
    let mut out = String::new();

    out.push_str(&format!("Value: {}\n", table.value_key.label()));
    out.push_str(
        format!(
            "{:<24} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}",
            table.group_key.label(),
            "n",
            "min",
            "q1",
            "median",
            "q3",
            "max",
            "outliers"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<24} {:-<6} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<8}",
        "", "", "", "", "", "", "", ""
    ));
    out.push('\n');

    for s in &table.groups {
        out.push_str(&format!(
            "{:<24} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}\n",
            truncate(&s.group, 24),
            s.count,
            fmt_amount(s.min),
            fmt_amount(s.q1),
            fmt_amount(s.median),
            fmt_amount(s.q3),
            fmt_amount(s.max),
            s.outliers
        ));
    }
    out.push_str(&skipped_note(table.skipped));

    out
}

fn format_histogram(hist: &Histogram) -> String {
    let mut out = String::new();
    let peak = hist.bins.iter().map(|b| b.count).max().unwrap_or(0);

    for bin in &hist.bins {
        let fraction = if peak > 0 { bin.count as f64 / peak as f64 } else { 0.0 };
        let range = format!("[{}, {}]", fmt_amount(bin.lower), fmt_amount(bin.upper));
        out.push_str(format!("{:<26} {:>6} {}", range, bin.count, bar(fraction)).trim_end());
        out.push('\n');

        if !bin.stacks.is_empty() {
            let parts: Vec<String> = bin.stacks.iter().map(|s| format!("{} {}", s.group, s.count)).collect();
            out.push_str(&format!("{:<26} {:>6} {}\n", "", "", truncate(&parts.join(", "), 60)));
        }
    }
    out.push_str(&skipped_note(hist.skipped));

    out
}

/// Table of raw records (preview).
fn format_records_table(rows: &[&LoanRecord]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>8} {:<20} {:<14} {:>10} {:>10} {:<10} {:<16}",
            "id", "country", "sector", "loan", "funded", "interval", "genders"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<8} {:-<20} {:-<14} {:-<10} {:-<10} {:-<10} {:-<16}",
        "", "", "", "", "", "", ""
    ));
    out.push('\n');

    for r in rows {
        let id = r.id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:>8} {:<20} {:<14} {:>10} {:>10} {:<10} {:<16}",
                id,
                truncate(&r.country, 20),
                truncate(&r.sector, 14),
                fmt_amount(r.loan_amount),
                fmt_amount(r.funded_amount),
                truncate(&r.repayment_interval, 10),
                truncate(&r.borrower_genders, 16),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_criteria(criteria: &FilterCriteria) -> String {
    let set = |s: &std::collections::BTreeSet<String>| {
        if s.is_empty() {
            "(any)".to_string()
        } else {
            s.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let bound = |b: Option<Decimal>| b.map(fmt_amount).unwrap_or_else(|| "auto".to_string());
    let intervals = match &criteria.intervals {
        IntervalSelection::AllOffered => "all offered".to_string(),
        IntervalSelection::Only(selected) if selected.is_empty() => "(none)".to_string(),
        IntervalSelection::Only(selected) => set(selected),
    };

    format!(
        "countries={} | sectors={} | amount={}..{} | intervals={}",
        set(&criteria.countries),
        set(&criteria.sectors),
        bound(criteria.min_amount),
        bound(criteria.max_amount),
        intervals
    )
}

fn fmt_amount(v: Decimal) -> String {
    format!("{:.2}", v.round_dp(2))
}

fn fmt_list(values: &[String], max: usize) -> String {
    if values.is_empty() {
        return "(none)".to_string();
    }
    let shown: Vec<&str> = values.iter().take(max).map(String::as_str).collect();
    let mut out = shown.join(", ");
    if values.len() > max {
        out.push_str(&format!(" (+{} more)", values.len() - max));
    }
    out
}

fn skipped_note(skipped: usize) -> String {
    if skipped == 0 {
        String::new()
    } else {
        format!("({skipped} record(s) skipped: empty group, negative value, or overflow)\n")
    }
}

fn bar(fraction: f64) -> String {
    let n = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(n)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
