//! Deterministic rendering of the typed aggregate into SAF-T (AO) XML.
//!
//! Element order is contractual and encoded in the emission sequence of each
//! block; the schema validator re-checks it downstream. Values are rendered
//! by the fixed formatters in [`crate::core::format`], so equal aggregates
//! always produce byte-identical documents.
//!
//! Text content is escaped by quick-xml; element names come from the fixed
//! vocabulary below and are never derived from input data.

use crate::core::{
    Account, Address, AuditFile, Customer, DocumentTotals, GeneralLedgerEntries, Header,
    InvoiceLine, Journal, MasterFiles, MovementLine, MovementOfGoods, Product, SaftError,
    SalesInvoice, SalesInvoices, SourceDocuments, StockMovement, Supplier, TaxTableEntry,
    Transaction, WithholdingTaxEntry, WorkingDocument, WorkingDocuments,
};
use crate::xml::writer::XmlWriter;

/// Target namespace of the SAF-T (AO) schema.
pub const SAFT_NAMESPACE: &str = "urn:OECD:StandardAuditFile-Tax:AO_1.04_01";

/// xsi:schemaLocation hint emitted on the root element.
pub const SAFT_SCHEMA_LOCATION: &str =
    "urn:OECD:StandardAuditFile-Tax:AO_1.04_01 SAFTAO1.04_01.xsd";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A top-level section of the audit file. Each block owns its complete
/// element subtree; the root renderer only fixes the block sequence.
trait Block {
    fn element_name(&self) -> &'static str;
    fn render(&self, w: &mut XmlWriter) -> Result<(), SaftError>;
}

/// Render the full audit file as a UTF-8 XML document.
pub fn to_saft_xml(file: &AuditFile) -> Result<String, SaftError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs(
        "AuditFile",
        &[
            ("xmlns", SAFT_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", SAFT_SCHEMA_LOCATION),
        ],
    )?;

    let blocks: [&dyn Block; 4] = [
        &file.header,
        &file.master_files,
        &file.general_ledger_entries,
        &file.source_documents,
    ];
    for block in blocks {
        w.start_element(block.element_name())?;
        block.render(&mut w)?;
        w.end_element(block.element_name())?;
    }

    w.end_element("AuditFile")?;
    w.into_string()
}

impl Block for Header {
    fn element_name(&self) -> &'static str {
        "Header"
    }

    fn render(&self, w: &mut XmlWriter) -> Result<(), SaftError> {
        w.text_element("AuditFileVersion", &self.audit_file_version)?
            .text_element("CompanyID", &self.company_id)?
            .text_element("TaxRegistrationNumber", &self.tax_registration_number)?
            .text_element("TaxAccountingBasis", self.tax_accounting_basis.code())?
            .text_element("CompanyName", &self.company_name)?
            .opt_text_element("BusinessName", self.business_name.as_deref())?;
        render_address(w, "CompanyAddress", &self.company_address)?;
        w.text_element("FiscalYear", &self.fiscal_year.to_string())?
            .date_element("StartDate", self.start_date)?
            .date_element("EndDate", self.end_date)?
            .text_element("CurrencyCode", &self.currency_code)?
            .datetime_element("DateCreated", self.date_created)?
            .text_element("TaxEntity", &self.tax_entity)?
            .text_element("ProductCompanyTaxID", &self.product_company_tax_id)?
            .text_element("SoftwareCertificateNumber", &self.software_certificate_number)?
            .text_element("ProductID", &self.product_id)?
            .text_element("ProductVersion", &self.product_version)?
            .opt_text_element("HeaderComment", self.header_comment.as_deref())?
            .amount_element("TotalDebit", self.totals.total_debit)?
            .amount_element("TotalCredit", self.totals.total_credit)?
            .amount_element("TotalSalesInvoices", self.totals.total_sales_invoices)?
            .count_element("NumberOfEntries", self.totals.number_of_entries)?;
        Ok(())
    }
}

impl Block for MasterFiles {
    fn element_name(&self) -> &'static str {
        "MasterFiles"
    }

    fn render(&self, w: &mut XmlWriter) -> Result<(), SaftError> {
        w.start_element("GeneralLedger")?;
        for account in &self.accounts {
            render_account(w, account)?;
        }
        w.end_element("GeneralLedger")?;
        for entry in &self.withholding_tax {
            render_withholding(w, entry)?;
        }
        for customer in &self.customers {
            render_customer(w, customer)?;
        }
        for supplier in &self.suppliers {
            render_supplier(w, supplier)?;
        }
        for product in &self.products {
            render_product(w, product)?;
        }
        w.start_element("TaxTable")?;
        for entry in &self.tax_table {
            render_tax_table_entry(w, entry)?;
        }
        w.end_element("TaxTable")?;
        Ok(())
    }
}

impl Block for GeneralLedgerEntries {
    fn element_name(&self) -> &'static str {
        "GeneralLedgerEntries"
    }

    fn render(&self, w: &mut XmlWriter) -> Result<(), SaftError> {
        for journal in &self.journals {
            render_journal(w, journal)?;
        }
        Ok(())
    }
}

impl Block for SourceDocuments {
    fn element_name(&self) -> &'static str {
        "SourceDocuments"
    }

    fn render(&self, w: &mut XmlWriter) -> Result<(), SaftError> {
        render_sales_invoices(w, &self.sales_invoices)?;
        if let Some(movements) = &self.movement_of_goods {
            render_movement_of_goods(w, movements)?;
        }
        if let Some(working) = &self.working_documents {
            render_working_documents(w, working)?;
        }
        Ok(())
    }
}

fn indicator(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

fn render_address(w: &mut XmlWriter, name: &str, address: &Address) -> Result<(), SaftError> {
    w.start_element(name)?
        .opt_text_element("StreetName", address.street_name.as_deref())?
        .text_element("City", &address.city)?
        .opt_text_element("PostalCode", address.postal_code.as_deref())?
        .opt_text_element("Province", address.province.as_deref())?
        .text_element("Country", &address.country)?
        .end_element(name)?;
    Ok(())
}

fn render_account(w: &mut XmlWriter, account: &Account) -> Result<(), SaftError> {
    w.start_element("Account")?
        .text_element("AccountID", &account.account_id)?
        .text_element("AccountDescription", &account.account_description)?
        .amount_element("OpeningDebitBalance", account.opening_debit_balance)?
        .amount_element("OpeningCreditBalance", account.opening_credit_balance)?
        .amount_element("ClosingDebitBalance", account.closing_debit_balance)?
        .amount_element("ClosingCreditBalance", account.closing_credit_balance)?
        .end_element("Account")?;
    Ok(())
}

fn render_withholding(w: &mut XmlWriter, entry: &WithholdingTaxEntry) -> Result<(), SaftError> {
    w.start_element("WithholdingTax")?
        .text_element("WithholdingTaxCode", &entry.code)?
        .text_element("WithholdingTaxDescription", &entry.description)?
        .text_element("WithholdingTaxType", entry.income_type.as_str())?
        .text_element("SourceDocumentID", &entry.source_document_id)?
        .opt_text_element("SupplierID", entry.supplier_id.as_deref())?
        .amount_element("TaxableBase", entry.taxable_base)?
        .decimal_element("WithholdingTaxRate", entry.rate)?
        .amount_element("WithholdingTaxAmount", entry.amount)?
        .end_element("WithholdingTax")?;
    Ok(())
}

fn render_customer(w: &mut XmlWriter, customer: &Customer) -> Result<(), SaftError> {
    w.start_element("Customer")?
        .text_element("CustomerID", &customer.customer_id)?
        .text_element("AccountID", &customer.account_id)?
        .text_element("CustomerTaxID", &customer.tax_id)?
        .text_element("CompanyName", &customer.name)?
        .text_element("SelfBillingIndicator", indicator(customer.self_billing))?;
    render_address(w, "BillingAddress", &customer.billing_address)?;
    w.end_element("Customer")?;
    Ok(())
}

fn render_supplier(w: &mut XmlWriter, supplier: &Supplier) -> Result<(), SaftError> {
    w.start_element("Supplier")?
        .text_element("SupplierID", &supplier.supplier_id)?
        .text_element("AccountID", &supplier.account_id)?
        .text_element("SupplierTaxID", &supplier.tax_id)?
        .text_element("CompanyName", &supplier.name)?
        .text_element("SelfBillingIndicator", indicator(supplier.self_billing))?;
    render_address(w, "BillingAddress", &supplier.billing_address)?;
    w.end_element("Supplier")?;
    Ok(())
}

fn render_product(w: &mut XmlWriter, product: &Product) -> Result<(), SaftError> {
    w.start_element("Product")?
        .text_element("ProductType", product.product_type.code())?
        .text_element("ProductCode", &product.product_code)?
        .opt_text_element("ProductGroup", product.product_group.as_deref())?
        .text_element("ProductDescription", &product.description)?
        .text_element("ProductNumberCode", &product.product_number_code)?
        .end_element("Product")?;
    Ok(())
}

fn render_tax_table_entry(w: &mut XmlWriter, entry: &TaxTableEntry) -> Result<(), SaftError> {
    w.start_element("TaxTableEntry")?
        .text_element("TaxType", entry.tax_type.code())?
        .text_element("TaxCode", &entry.tax_code)?
        .text_element("Description", &entry.description)?
        .text_element("TaxCountryRegion", &entry.country_region)?
        .decimal_element("TaxPercentage", entry.percentage)?
        .end_element("TaxTableEntry")?;
    Ok(())
}

fn render_journal(w: &mut XmlWriter, journal: &Journal) -> Result<(), SaftError> {
    w.start_element("Journal")?
        .text_element("JournalID", &journal.journal_id)?
        .text_element("Description", &journal.description)?;
    for transaction in &journal.transactions {
        render_transaction(w, transaction)?;
    }
    w.end_element("Journal")?;
    Ok(())
}

fn render_transaction(w: &mut XmlWriter, transaction: &Transaction) -> Result<(), SaftError> {
    w.start_element("Transaction")?
        .text_element("TransactionID", &transaction.transaction_id)?
        .date_element("TransactionDate", transaction.transaction_date)?
        .text_element("SourceID", &transaction.source_id)?
        .text_element("Description", &transaction.description)?
        .datetime_element("SystemEntryDate", transaction.system_entry_date)?;
    for line in &transaction.lines {
        w.start_element("Line")?
            .text_element("RecordID", &line.record_id)?
            .text_element("AccountID", &line.account_id)?
            .opt_text_element("Description", line.description.as_deref())?
            .amount_element("DebitAmount", line.debit)?
            .amount_element("CreditAmount", line.credit)?
            .end_element("Line")?;
    }
    w.end_element("Transaction")?;
    Ok(())
}

fn render_sales_invoices(w: &mut XmlWriter, section: &SalesInvoices) -> Result<(), SaftError> {
    w.start_element("SalesInvoices")?
        .count_element("NumberOfEntries", section.number_of_entries)?
        .amount_element("TotalDebit", section.total_debit)?
        .amount_element("TotalCredit", section.total_credit)?;
    for invoice in &section.invoices {
        render_invoice(w, invoice)?;
    }
    w.end_element("SalesInvoices")?;
    Ok(())
}

fn render_invoice(w: &mut XmlWriter, invoice: &SalesInvoice) -> Result<(), SaftError> {
    w.start_element("Invoice")?
        .text_element("InvoiceNo", &invoice.invoice_no)?
        .text_element("DocumentStatus", invoice.status.code())?
        .opt_text_element("Hash", invoice.hash.as_deref())?
        .date_element("InvoiceDate", invoice.invoice_date)?
        .text_element("InvoiceType", invoice.invoice_type.code())?
        .datetime_element("SystemEntryDate", invoice.system_entry_date)?
        .text_element("CustomerID", &invoice.customer_id)?;
    for line in &invoice.lines {
        render_document_line(w, line)?;
    }
    render_document_totals(w, &invoice.totals)?;
    w.end_element("Invoice")?;
    Ok(())
}

fn render_document_line(w: &mut XmlWriter, line: &InvoiceLine) -> Result<(), SaftError> {
    w.start_element("Line")?
        .count_element("LineNumber", u64::from(line.line_number))?
        .text_element("ProductCode", &line.product_code)?
        .opt_text_element("ProductDescription", line.description.as_deref())?
        .decimal_element("Quantity", line.quantity)?
        .text_element("UnitOfMeasure", &line.unit_of_measure)?
        .decimal_element("UnitPrice", line.unit_price)?
        .amount_element("CreditAmount", line.credit_amount)?;
    if let Some(tax) = &line.tax {
        w.start_element("Tax")?
            .text_element("TaxType", tax.tax_type.code())?
            .text_element("TaxCountryRegion", &tax.country_region)?
            .text_element("TaxCode", &tax.tax_code)?
            .decimal_element("TaxPercentage", tax.percentage)?
            .end_element("Tax")?;
    }
    w.end_element("Line")?;
    Ok(())
}

fn render_document_totals(w: &mut XmlWriter, totals: &DocumentTotals) -> Result<(), SaftError> {
    w.start_element("DocumentTotals")?
        .amount_element("TaxPayable", totals.tax_payable)?
        .amount_element("NetTotal", totals.net_total)?
        .amount_element("GrossTotal", totals.gross_total)?
        .end_element("DocumentTotals")?;
    Ok(())
}

fn render_movement_of_goods(w: &mut XmlWriter, section: &MovementOfGoods) -> Result<(), SaftError> {
    w.start_element("MovementOfGoods")?
        .count_element("NumberOfMovementLines", section.number_of_movement_lines)?
        .decimal_element("TotalQuantityIssued", section.total_quantity_issued)?;
    for movement in &section.movements {
        render_stock_movement(w, movement)?;
    }
    w.end_element("MovementOfGoods")?;
    Ok(())
}

fn render_stock_movement(w: &mut XmlWriter, movement: &StockMovement) -> Result<(), SaftError> {
    w.start_element("StockMovement")?
        .text_element("DocumentNumber", &movement.document_number)?
        .date_element("MovementDate", movement.movement_date)?
        .text_element("MovementType", movement.movement_type.code())?
        .opt_text_element("CustomerID", movement.customer_id.as_deref())?;
    for line in &movement.lines {
        render_movement_line(w, line)?;
    }
    w.end_element("StockMovement")?;
    Ok(())
}

fn render_movement_line(w: &mut XmlWriter, line: &MovementLine) -> Result<(), SaftError> {
    w.start_element("Line")?
        .count_element("LineNumber", u64::from(line.line_number))?
        .text_element("ProductCode", &line.product_code)?
        .decimal_element("Quantity", line.quantity)?
        .decimal_element("UnitPrice", line.unit_price)?
        .end_element("Line")?;
    Ok(())
}

fn render_working_documents(w: &mut XmlWriter, section: &WorkingDocuments) -> Result<(), SaftError> {
    w.start_element("WorkingDocuments")?
        .count_element("NumberOfEntries", section.number_of_entries)?
        .amount_element("TotalDebit", section.total_debit)?
        .amount_element("TotalCredit", section.total_credit)?;
    for document in &section.documents {
        render_work_document(w, document)?;
    }
    w.end_element("WorkingDocuments")?;
    Ok(())
}

fn render_work_document(w: &mut XmlWriter, document: &WorkingDocument) -> Result<(), SaftError> {
    w.start_element("WorkDocument")?
        .text_element("DocumentNumber", &document.document_number)?
        .date_element("DocumentDate", document.document_date)?
        .text_element("DocumentType", document.document_type.code())?
        .text_element("CustomerID", &document.customer_id)?;
    for line in &document.lines {
        render_document_line(w, line)?;
    }
    render_document_totals(w, &document.totals)?;
    w.end_element("WorkDocument")?;
    Ok(())
}
