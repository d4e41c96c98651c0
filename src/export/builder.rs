//! Document builder: assembles the audit file aggregate and enforces
//! full-file consistency before serialization is attempted.
//!
//! This is the single place where cross-section references are resolved:
//! every account, customer, supplier, product, and tax code used by a
//! detail record must exist in the corresponding master list. Any dangling
//! reference fails the run with a [`SaftError::ReferentialIntegrity`]
//! identifying the missing ID and the referencing record.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::core::format::round_amount;
use crate::core::{
    AUDIT_FILE_VERSION, AuditFile, GeneralLedgerEntries, Header, HeaderTotals, InvoiceLine,
    Period, SaftError, SoftwareInfo,
};
use crate::extract::Extraction;

/// Build the audit file from validated extractor output and the computed
/// totals. `created` becomes the header's DateCreated; the caller supplies
/// it so that equal inputs build equal files.
pub fn build_audit_file(
    extraction: Extraction,
    totals: HeaderTotals,
    period: Period,
    software: &SoftwareInfo,
    created: NaiveDateTime,
) -> Result<AuditFile, SaftError> {
    let refs = MasterRefs::collect(&extraction)?;
    check_ledger(&extraction, &refs)?;
    check_documents(&extraction, &refs)?;
    check_withholding(&extraction, &refs)?;

    let company = extraction.master.company;
    let header = Header {
        audit_file_version: AUDIT_FILE_VERSION.into(),
        company_id: company.company_id,
        tax_registration_number: company.tax_id.clone(),
        tax_accounting_basis: company.tax_accounting_basis,
        company_name: company.name,
        business_name: company.business_name,
        company_address: company.address,
        fiscal_year: period.fiscal_year(),
        start_date: period.start(),
        end_date: period.end(),
        currency_code: company.currency_code,
        date_created: created,
        tax_entity: company.tax_entity,
        product_company_tax_id: if software.product_company_tax_id.is_empty() {
            company.tax_id
        } else {
            software.product_company_tax_id.clone()
        },
        software_certificate_number: software.software_certificate_number.clone(),
        product_id: software.product_id.clone(),
        product_version: software.product_version.clone(),
        header_comment: None,
        totals,
    };

    Ok(AuditFile {
        header,
        master_files: crate::core::MasterFiles {
            accounts: extraction.master.accounts,
            withholding_tax: extraction.withholding,
            customers: extraction.master.customers,
            suppliers: extraction.master.suppliers,
            products: extraction.master.products,
            tax_table: extraction.master.tax_table,
        },
        general_ledger_entries: GeneralLedgerEntries {
            journals: extraction.journals,
        },
        source_documents: extraction.documents,
    })
}

/// Lookup sets over the master lists, with uniqueness enforced while
/// collecting.
struct MasterRefs {
    accounts: HashSet<String>,
    customers: HashSet<String>,
    suppliers: HashSet<String>,
    products: HashSet<String>,
    tax_codes: HashSet<String>,
}

impl MasterRefs {
    fn collect(extraction: &Extraction) -> Result<Self, SaftError> {
        let master = &extraction.master;
        Ok(Self {
            accounts: unique_ids(
                master.accounts.iter().map(|a| a.account_id.as_str()),
                "Account",
                "AccountID",
            )?,
            customers: unique_ids(
                master.customers.iter().map(|c| c.customer_id.as_str()),
                "Customer",
                "CustomerID",
            )?,
            suppliers: unique_ids(
                master.suppliers.iter().map(|s| s.supplier_id.as_str()),
                "Supplier",
                "SupplierID",
            )?,
            products: unique_ids(
                master.products.iter().map(|p| p.product_code.as_str()),
                "Product",
                "ProductCode",
            )?,
            tax_codes: unique_ids(
                master.tax_table.iter().map(|t| t.tax_code.as_str()),
                "TaxTableEntry",
                "TaxCode",
            )?,
        })
    }
}

fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    record: &str,
    field: &str,
) -> Result<HashSet<String>, SaftError> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id.to_string()) {
            return Err(SaftError::DataIntegrity {
                record: format!("{record} \"{id}\""),
                message: format!("duplicate {field} within the file"),
            });
        }
    }
    Ok(set)
}

fn check_ledger(extraction: &Extraction, refs: &MasterRefs) -> Result<(), SaftError> {
    for journal in &extraction.journals {
        for transaction in &journal.transactions {
            let label = format!("Transaction \"{}\"", transaction.transaction_id);
            if !transaction.is_balanced() {
                return Err(SaftError::DataIntegrity {
                    record: label,
                    message: format!(
                        "debit total {} does not equal credit total {}",
                        transaction.debit_total(),
                        transaction.credit_total()
                    ),
                });
            }
            for line in &transaction.lines {
                if !refs.accounts.contains(&line.account_id) {
                    return Err(SaftError::ReferentialIntegrity {
                        referrer: format!("{label} line \"{}\"", line.record_id),
                        kind: "AccountID",
                        id: line.account_id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_documents(extraction: &Extraction, refs: &MasterRefs) -> Result<(), SaftError> {
    for invoice in &extraction.documents.sales_invoices.invoices {
        let label = format!("SalesInvoice \"{}\"", invoice.invoice_no);
        if !refs.customers.contains(&invoice.customer_id) {
            return Err(SaftError::ReferentialIntegrity {
                referrer: label,
                kind: "CustomerID",
                id: invoice.customer_id.clone(),
            });
        }
        check_document_lines(&label, &invoice.lines, refs)?;

        // Invoice total arithmetic at the file's fixed precision.
        let net = invoice.line_net_total();
        if invoice.totals.net_total != net {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: format!(
                    "NetTotal {} does not equal the sum of line amounts {net}",
                    invoice.totals.net_total
                ),
            });
        }
        let gross = round_amount(invoice.totals.net_total + invoice.totals.tax_payable);
        if invoice.totals.gross_total != gross {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: format!(
                    "GrossTotal {} does not equal NetTotal + TaxPayable = {gross}",
                    invoice.totals.gross_total
                ),
            });
        }
    }

    if let Some(movements) = &extraction.documents.movement_of_goods {
        for movement in &movements.movements {
            let label = format!("StockMovement \"{}\"", movement.document_number);
            if let Some(customer_id) = &movement.customer_id {
                if !refs.customers.contains(customer_id) {
                    return Err(SaftError::ReferentialIntegrity {
                        referrer: label,
                        kind: "CustomerID",
                        id: customer_id.clone(),
                    });
                }
            }
            for line in &movement.lines {
                if !refs.products.contains(&line.product_code) {
                    return Err(SaftError::ReferentialIntegrity {
                        referrer: format!("{label} line {}", line.line_number),
                        kind: "ProductCode",
                        id: line.product_code.clone(),
                    });
                }
            }
        }
    }

    if let Some(working) = &extraction.documents.working_documents {
        for document in &working.documents {
            let label = format!("WorkingDocument \"{}\"", document.document_number);
            if !refs.customers.contains(&document.customer_id) {
                return Err(SaftError::ReferentialIntegrity {
                    referrer: label,
                    kind: "CustomerID",
                    id: document.customer_id.clone(),
                });
            }
            check_document_lines(&label, &document.lines, refs)?;
        }
    }

    Ok(())
}

fn check_document_lines(
    document: &str,
    lines: &[InvoiceLine],
    refs: &MasterRefs,
) -> Result<(), SaftError> {
    for line in lines {
        let referrer = format!("{document} line {}", line.line_number);
        if !refs.products.contains(&line.product_code) {
            return Err(SaftError::ReferentialIntegrity {
                referrer,
                kind: "ProductCode",
                id: line.product_code.clone(),
            });
        }
        if let Some(tax) = &line.tax {
            if !refs.tax_codes.contains(&tax.tax_code) {
                return Err(SaftError::ReferentialIntegrity {
                    referrer,
                    kind: "TaxCode",
                    id: tax.tax_code.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_withholding(extraction: &Extraction, refs: &MasterRefs) -> Result<(), SaftError> {
    for entry in &extraction.withholding {
        let label = format!(
            "WithholdingTax \"{}\" on document \"{}\"",
            entry.code, entry.source_document_id
        );
        if let Some(supplier_id) = &entry.supplier_id {
            if !refs.suppliers.contains(supplier_id) {
                return Err(SaftError::ReferentialIntegrity {
                    referrer: label,
                    kind: "SupplierID",
                    id: supplier_id.clone(),
                });
            }
        }
        let expected = entry.expected_amount();
        if entry.amount != expected {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: format!(
                    "WithholdingTaxAmount {} does not equal TaxableBase × rate = {expected}",
                    entry.amount
                ),
            });
        }
    }
    Ok(())
}
