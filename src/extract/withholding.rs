//! Withholding-tax extraction.

use rust_decimal::Decimal;

use super::{WithholdingSource, missing_field};
use crate::core::format::round_amount;
use crate::core::{Period, SaftError, WithholdingIncomeType, WithholdingTaxEntry};

/// Raw withholding record as stored by the host system.
#[derive(Debug, Clone)]
pub struct WithholdingRecord {
    /// Withheld tax code (IRT, IRPC, ...).
    pub code: String,
    pub description: Option<String>,
    pub income_type: Option<WithholdingIncomeType>,
    /// The supplier document that originated the retention.
    pub source_document_id: String,
    pub supplier_id: Option<String>,
    pub taxable_base: Decimal,
    /// Percentage rate (6.5 means 6.5%).
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Read and validate the period's withholding records. The arithmetic
/// relation between base, rate and amount is checked later by the document
/// builder together with the other cross-cutting invariants.
pub fn extract_withholding(
    src: &dyn WithholdingSource,
    period: Period,
) -> Result<Vec<WithholdingTaxEntry>, SaftError> {
    let records = src.withholding_entries(period)?;
    let mut entries = Vec::with_capacity(records.len());
    for (i, rec) in records.into_iter().enumerate() {
        entries.push(convert_withholding(i, rec)?);
    }
    Ok(entries)
}

fn convert_withholding(index: usize, rec: WithholdingRecord) -> Result<WithholdingTaxEntry, SaftError> {
    if rec.code.trim().is_empty() {
        return Err(missing_field(
            format!("WithholdingTax[{index}]"),
            "WithholdingTaxCode",
        ));
    }
    let label = format!("WithholdingTax \"{}\"", rec.code);

    if rec.source_document_id.trim().is_empty() {
        return Err(missing_field(label, "SourceDocumentID"));
    }
    if rec.taxable_base < Decimal::ZERO || rec.rate < Decimal::ZERO || rec.amount < Decimal::ZERO {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "negative taxable base, rate, or amount".into(),
        });
    }

    Ok(WithholdingTaxEntry {
        description: rec
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| rec.code.clone()),
        code: rec.code,
        income_type: rec.income_type.unwrap_or(WithholdingIncomeType::Services),
        source_document_id: rec.source_document_id,
        supplier_id: rec.supplier_id.filter(|s| !s.trim().is_empty()),
        taxable_base: round_amount(rec.taxable_base),
        rate: rec.rate,
        amount: round_amount(rec.amount),
    })
}
