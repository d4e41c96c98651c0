//! Cross-cutting header totals.

use rust_decimal::Decimal;

use crate::core::HeaderTotals;
use crate::core::format::round_amount;
use crate::extract::Extraction;

/// Compute the header totals from the full extractor output.
///
/// Pure and deterministic: identical input always yields identical totals.
/// Withholding entries carry no header total of their own but are part of
/// the snapshot this runs over.
pub fn aggregate_totals(extraction: &Extraction) -> HeaderTotals {
    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;
    let mut number_of_entries: u64 = 0;

    for journal in &extraction.journals {
        for transaction in &journal.transactions {
            number_of_entries += 1;
            for line in &transaction.lines {
                total_debit += line.debit;
                total_credit += line.credit;
            }
        }
    }

    let total_sales_invoices: Decimal = extraction
        .documents
        .sales_invoices
        .invoices
        .iter()
        .map(|i| i.totals.gross_total)
        .sum();

    HeaderTotals {
        total_debit: round_amount(total_debit),
        total_credit: round_amount(total_credit),
        total_sales_invoices: round_amount(total_sales_invoices),
        number_of_entries,
    }
}
