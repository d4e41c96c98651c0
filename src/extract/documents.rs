//! Source document extraction: sales invoices, goods movements, and
//! working documents.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::{DocumentsSource, missing_field};
use crate::core::format::round_amount;
use crate::core::{
    DocumentStatus, DocumentTotals, InvoiceLine, InvoiceType, LineTax, MovementLine,
    MovementOfGoods, MovementType, Period, SaftError, SalesInvoice, SalesInvoices,
    SourceDocuments, StockMovement, TaxType, WorkingDocument, WorkingDocumentType,
    WorkingDocuments,
};

/// Raw sales document as stored by the host system.
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub invoice_no: String,
    pub invoice_date: NaiveDate,
    pub invoice_type: Option<InvoiceType>,
    pub status: Option<DocumentStatus>,
    pub hash: Option<String>,
    pub system_entry_date: Option<NaiveDateTime>,
    /// Required: an invoice without a customer reference fails the run.
    pub customer_id: Option<String>,
    pub lines: Vec<InvoiceLineRecord>,
    /// When absent, totals are computed from the lines.
    pub totals: Option<TotalsRecord>,
}

/// Raw document line.
#[derive(Debug, Clone, Default)]
pub struct InvoiceLineRecord {
    pub product_code: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_of_measure: Option<String>,
    pub unit_price: Decimal,
    pub tax: Option<LineTaxRecord>,
}

/// Raw line tax reference.
#[derive(Debug, Clone, Default)]
pub struct LineTaxRecord {
    pub tax_type: Option<TaxType>,
    pub tax_code: String,
    pub percentage: Decimal,
    pub country_region: Option<String>,
}

/// Raw document totals, as recorded by the issuing system.
#[derive(Debug, Clone, Copy)]
pub struct TotalsRecord {
    pub tax_payable: Decimal,
    pub net_total: Decimal,
    pub gross_total: Decimal,
}

/// Raw goods movement document.
#[derive(Debug, Clone)]
pub struct StockMovementRecord {
    pub document_number: String,
    pub movement_date: NaiveDate,
    pub movement_type: Option<MovementType>,
    pub customer_id: Option<String>,
    pub lines: Vec<MovementLineRecord>,
}

/// Raw goods movement line.
#[derive(Debug, Clone, Default)]
pub struct MovementLineRecord {
    pub product_code: String,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

/// Raw working document (quote/proforma).
#[derive(Debug, Clone)]
pub struct WorkingDocumentRecord {
    pub document_number: String,
    pub document_date: NaiveDate,
    pub document_type: Option<WorkingDocumentType>,
    pub customer_id: Option<String>,
    pub lines: Vec<InvoiceLineRecord>,
    pub totals: Option<TotalsRecord>,
}

/// Read and validate all source documents for the period.
pub fn extract_documents(
    src: &dyn DocumentsSource,
    period: Period,
) -> Result<SourceDocuments, SaftError> {
    let mut invoices = Vec::new();
    for rec in src.sales_invoices(period)? {
        invoices.push(convert_invoice(rec, period)?);
    }
    let invoice_gross: Decimal = round_amount(invoices.iter().map(|i| i.totals.gross_total).sum());
    let sales_invoices = SalesInvoices {
        number_of_entries: invoices.len() as u64,
        total_debit: invoice_gross,
        total_credit: invoice_gross,
        invoices,
    };

    let mut movements = Vec::new();
    for rec in src.stock_movements(period)? {
        movements.push(convert_movement(rec, period)?);
    }
    let movement_of_goods = if movements.is_empty() {
        None
    } else {
        Some(MovementOfGoods {
            number_of_movement_lines: movements.iter().map(|m| m.lines.len() as u64).sum(),
            total_quantity_issued: round_amount(
                movements
                    .iter()
                    .flat_map(|m| m.lines.iter())
                    .map(|l| l.quantity)
                    .sum(),
            ),
            movements,
        })
    };

    let mut documents = Vec::new();
    for rec in src.working_documents(period)? {
        documents.push(convert_working_document(rec, period)?);
    }
    let working_documents = if documents.is_empty() {
        None
    } else {
        let gross: Decimal = round_amount(documents.iter().map(|d| d.totals.gross_total).sum());
        Some(WorkingDocuments {
            number_of_entries: documents.len() as u64,
            total_debit: gross,
            total_credit: gross,
            documents,
        })
    };

    Ok(SourceDocuments {
        sales_invoices,
        movement_of_goods,
        working_documents,
    })
}

fn convert_invoice(rec: InvoiceRecord, period: Period) -> Result<SalesInvoice, SaftError> {
    if rec.invoice_no.trim().is_empty() {
        return Err(missing_field("SalesInvoice", "InvoiceNo"));
    }
    let label = format!("SalesInvoice \"{}\"", rec.invoice_no);

    check_in_period(&label, rec.invoice_date, period)?;
    let customer_id = match rec.customer_id {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(missing_field(label, "CustomerID")),
    };
    if rec.lines.is_empty() {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "document has no lines".into(),
        });
    }

    let lines = convert_lines(&label, rec.lines)?;
    let totals = document_totals(rec.totals, &lines);

    Ok(SalesInvoice {
        system_entry_date: rec
            .system_entry_date
            .unwrap_or_else(|| rec.invoice_date.and_time(NaiveTime::MIN)),
        invoice_no: rec.invoice_no,
        status: rec.status.unwrap_or(DocumentStatus::Normal),
        hash: rec.hash,
        invoice_date: rec.invoice_date,
        invoice_type: rec.invoice_type.unwrap_or(InvoiceType::Invoice),
        customer_id,
        lines,
        totals,
    })
}

fn convert_lines(
    document: &str,
    records: Vec<InvoiceLineRecord>,
) -> Result<Vec<InvoiceLine>, SaftError> {
    let mut lines = Vec::with_capacity(records.len());
    for (i, rec) in records.into_iter().enumerate() {
        let label = format!("{document} line {}", i + 1);
        if rec.product_code.trim().is_empty() {
            return Err(missing_field(label, "ProductCode"));
        }
        if rec.quantity <= Decimal::ZERO {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: format!("non-positive quantity {}", rec.quantity),
            });
        }
        let tax = match rec.tax {
            Some(t) => {
                if t.tax_code.trim().is_empty() {
                    return Err(missing_field(label, "TaxCode"));
                }
                Some(LineTax {
                    tax_type: t.tax_type.unwrap_or(TaxType::Vat),
                    country_region: t.country_region.unwrap_or_else(|| "AO".into()),
                    tax_code: t.tax_code,
                    percentage: t.percentage,
                })
            }
            None => None,
        };
        lines.push(InvoiceLine {
            line_number: (i + 1) as u32,
            product_code: rec.product_code,
            description: rec.description,
            credit_amount: round_amount(rec.quantity * rec.unit_price),
            quantity: rec.quantity,
            unit_of_measure: rec.unit_of_measure.unwrap_or_else(|| "UN".into()),
            unit_price: rec.unit_price,
            tax,
        });
    }
    Ok(lines)
}

/// Use the totals recorded by the issuing system when present (the builder
/// re-checks the arithmetic either way), otherwise compute them from the
/// lines with per-line tax rounding.
fn document_totals(recorded: Option<TotalsRecord>, lines: &[InvoiceLine]) -> DocumentTotals {
    if let Some(t) = recorded {
        return DocumentTotals {
            tax_payable: round_amount(t.tax_payable),
            net_total: round_amount(t.net_total),
            gross_total: round_amount(t.gross_total),
        };
    }
    let net: Decimal = round_amount(lines.iter().map(|l| l.credit_amount).sum());
    let tax: Decimal = round_amount(
        lines
            .iter()
            .map(|l| match &l.tax {
                Some(t) => round_amount(l.credit_amount * t.percentage / Decimal::ONE_HUNDRED),
                None => Decimal::ZERO,
            })
            .sum(),
    );
    DocumentTotals {
        tax_payable: tax,
        net_total: net,
        gross_total: net + tax,
    }
}

fn convert_movement(rec: StockMovementRecord, period: Period) -> Result<StockMovement, SaftError> {
    if rec.document_number.trim().is_empty() {
        return Err(missing_field("StockMovement", "DocumentNumber"));
    }
    let label = format!("StockMovement \"{}\"", rec.document_number);

    check_in_period(&label, rec.movement_date, period)?;
    if rec.lines.is_empty() {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "document has no lines".into(),
        });
    }

    let mut lines = Vec::with_capacity(rec.lines.len());
    for (i, line) in rec.lines.into_iter().enumerate() {
        let line_label = format!("{label} line {}", i + 1);
        if line.product_code.trim().is_empty() {
            return Err(missing_field(line_label, "ProductCode"));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(SaftError::DataIntegrity {
                record: line_label,
                message: format!("non-positive quantity {}", line.quantity),
            });
        }
        lines.push(MovementLine {
            line_number: (i + 1) as u32,
            product_code: line.product_code,
            quantity: line.quantity,
            unit_price: line.unit_price.unwrap_or_default(),
        });
    }

    Ok(StockMovement {
        document_number: rec.document_number,
        movement_date: rec.movement_date,
        movement_type: rec.movement_type.unwrap_or(MovementType::Delivery),
        customer_id: rec.customer_id.filter(|c| !c.trim().is_empty()),
        lines,
    })
}

fn convert_working_document(
    rec: WorkingDocumentRecord,
    period: Period,
) -> Result<WorkingDocument, SaftError> {
    if rec.document_number.trim().is_empty() {
        return Err(missing_field("WorkingDocument", "DocumentNumber"));
    }
    let label = format!("WorkingDocument \"{}\"", rec.document_number);

    check_in_period(&label, rec.document_date, period)?;
    let customer_id = match rec.customer_id {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(missing_field(label, "CustomerID")),
    };
    if rec.lines.is_empty() {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "document has no lines".into(),
        });
    }

    let lines = convert_lines(&label, rec.lines)?;
    let totals = document_totals(rec.totals, &lines);

    Ok(WorkingDocument {
        document_number: rec.document_number,
        document_date: rec.document_date,
        document_type: rec.document_type.unwrap_or(WorkingDocumentType::Quote),
        customer_id,
        lines,
        totals,
    })
}

fn check_in_period(record: &str, date: NaiveDate, period: Period) -> Result<(), SaftError> {
    if period.contains(date) {
        Ok(())
    } else {
        Err(SaftError::DataIntegrity {
            record: record.into(),
            message: format!(
                "document date {date} is outside the reporting period {}..{}",
                period.start(),
                period.end()
            ),
        })
    }
}
