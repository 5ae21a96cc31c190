//! Borrower gender distribution.
//!
//! Group loans list one gender token per borrower, so a record contributes one
//! unit per token (per-borrower counting), after trimming and lower-casing.

use crate::aggregate::group::{GroupCounts, Tally, counts_descending};
use crate::domain::LoanRecord;

/// Borrowers per normalized gender token, largest first.
///
/// Records without any token are counted in `skipped`.
pub fn gender_distribution<'a>(records: impl IntoIterator<Item = &'a LoanRecord>) -> GroupCounts {
    let mut tally: Tally<usize> = Tally::new();
    let mut skipped = 0usize;

    for record in records {
        let tokens = record.gender_tokens();
        if tokens.is_empty() {
            skipped += 1;
            continue;
        }
        for token in tokens {
            *tally.slot(&token) += 1;
        }
    }

    counts_descending("gender", tally, skipped)
}
