use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::format::round_amount;

/// SAF-T (AO) file format version reported in the header.
pub const AUDIT_FILE_VERSION: &str = "1.04_01";

/// The root aggregate — one complete audit file for a (company, period) run.
///
/// Built once per run, serialized, validated, then discarded. Sections own
/// their child record lists; records reference each other only by stable
/// identifiers, never by embedding, so cross-section invariants reduce to
/// simple lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFile {
    pub header: Header,
    pub master_files: MasterFiles,
    pub general_ledger_entries: GeneralLedgerEntries,
    pub source_documents: SourceDocuments,
}

/// Header block: company identity, period, software identification, and the
/// aggregate totals that must reconcile with the detail sections.
///
/// Computed once per run from the totals aggregator; never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// AuditFileVersion — fixed per target schema version.
    pub audit_file_version: String,
    /// CompanyID — commercial registry identifier, falls back to the tax ID.
    pub company_id: String,
    /// TaxRegistrationNumber (NIF).
    pub tax_registration_number: String,
    /// TaxAccountingBasis.
    pub tax_accounting_basis: TaxAccountingBasis,
    /// CompanyName — legal name.
    pub company_name: String,
    /// BusinessName — trading name, if different.
    pub business_name: Option<String>,
    /// CompanyAddress.
    pub company_address: Address,
    /// FiscalYear — year of the period end.
    pub fiscal_year: i32,
    /// StartDate / EndDate — reporting period, both inclusive.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// CurrencyCode (ISO 4217, "AOA").
    pub currency_code: String,
    /// DateCreated — generation timestamp, seconds precision.
    pub date_created: NaiveDateTime,
    /// TaxEntity — establishment covered by the file ("Global").
    pub tax_entity: String,
    /// ProductCompanyTaxID — tax ID of the software producer.
    pub product_company_tax_id: String,
    /// SoftwareCertificateNumber — AGT certificate of the producing software.
    pub software_certificate_number: String,
    /// ProductID / ProductVersion — software identification.
    pub product_id: String,
    pub product_version: String,
    /// HeaderComment — free text.
    pub header_comment: Option<String>,
    /// Aggregate totals reconciling with the detail sections.
    pub totals: HeaderTotals,
}

/// The cross-cutting header totals computed by the totals aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaderTotals {
    /// TotalDebit — sum of all debit lines across all transactions.
    pub total_debit: Decimal,
    /// TotalCredit — sum of all credit lines across all transactions.
    pub total_credit: Decimal,
    /// TotalSalesInvoices — sum of invoice gross totals.
    pub total_sales_invoices: Decimal,
    /// NumberOfEntries — count of ledger transactions.
    pub number_of_entries: u64,
}

/// Postal address (CompanyAddress / BillingAddress).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street_name: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    /// Country code (ISO 3166-1 alpha-2, "AO").
    pub country: String,
}

/// TaxAccountingBasis — scope of the data in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxAccountingBasis {
    /// C — accounting.
    Accounting,
    /// F — invoicing.
    Invoicing,
    /// I — integrated accounting and invoicing.
    Integrated,
}

impl TaxAccountingBasis {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Accounting => "C",
            Self::Invoicing => "F",
            Self::Integrated => "I",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(Self::Accounting),
            "F" => Some(Self::Invoicing),
            "I" => Some(Self::Integrated),
            _ => None,
        }
    }
}

/// MasterFiles block. The subsection order is contractual:
/// GeneralLedger, WithholdingTax, Customer, Supplier, Product, TaxTable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterFiles {
    pub accounts: Vec<Account>,
    pub withholding_tax: Vec<WithholdingTaxEntry>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub products: Vec<Product>,
    pub tax_table: Vec<TaxTableEntry>,
}

/// A chart-of-accounts entry. Transaction lines refer to it by
/// `account_id` only — relation plus lookup, never ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub account_description: String,
    pub opening_debit_balance: Decimal,
    pub opening_credit_balance: Decimal,
    pub closing_debit_balance: Decimal,
    pub closing_credit_balance: Decimal,
}

/// A withholding-tax record tied to a supplier document.
///
/// Invariant: `amount == round(taxable_base × rate / 100, 2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingTaxEntry {
    /// WithholdingTaxCode (IRT, IRPC, ...).
    pub code: String,
    pub description: String,
    /// WithholdingTaxType — withheld-income category.
    pub income_type: WithholdingIncomeType,
    /// SourceDocumentID — the supplier document that originated the retention.
    pub source_document_id: String,
    pub supplier_id: Option<String>,
    pub taxable_base: Decimal,
    /// Rate as a percentage (6.5 means 6.5%).
    pub rate: Decimal,
    pub amount: Decimal,
}

impl WithholdingTaxEntry {
    /// The amount the stored base and rate imply, at the file's precision.
    pub fn expected_amount(&self) -> Decimal {
        round_amount(self.taxable_base * self.rate / Decimal::ONE_HUNDRED)
    }
}

/// Withheld-income categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithholdingIncomeType {
    Services,
    Capital,
    Employment,
    Other,
}

impl WithholdingIncomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Services => "Services",
            Self::Capital => "Capital",
            Self::Employment => "Employment",
            Self::Other => "Other",
        }
    }
}

/// Customer master record. `customer_id` is the join key used by source
/// documents and must be unique within the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    /// Receivables account in the chart of accounts; empty when unmapped.
    pub account_id: String,
    /// CustomerTaxID — "999999999" stands for the anonymous final consumer.
    pub tax_id: String,
    pub name: String,
    pub billing_address: Address,
    pub self_billing: bool,
}

/// Supplier master record, join key for withholding entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: String,
    /// Payables account in the chart of accounts; empty when unmapped.
    pub account_id: String,
    pub tax_id: String,
    pub name: String,
    pub billing_address: Address,
    pub self_billing: bool,
}

/// Product/service master record. `product_code` is the join key used by
/// document lines and must be unique within the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_type: ProductType,
    pub product_code: String,
    pub product_group: Option<String>,
    pub description: String,
    /// ProductNumberCode — barcode where one exists, else the internal code.
    pub product_number_code: String,
}

/// ProductType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// P — goods.
    Goods,
    /// S — services.
    Service,
    /// O — other.
    Other,
}

impl ProductType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Goods => "P",
            Self::Service => "S",
            Self::Other => "O",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(Self::Goods),
            "S" => Some(Self::Service),
            "O" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A tax code with its rate, referenced by ID from invoice lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTableEntry {
    pub tax_type: TaxType,
    /// TaxCode (NOR, ISE, NSU, ...).
    pub tax_code: String,
    pub description: String,
    /// TaxCountryRegion ("AO").
    pub country_region: String,
    /// Rate as a percentage.
    pub percentage: Decimal,
}

/// TaxType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxType {
    /// IVA — value added tax.
    Vat,
    /// IS — stamp duty.
    StampDuty,
    /// NS — not subject to IVA or IS.
    NotSubject,
}

impl TaxType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vat => "IVA",
            Self::StampDuty => "IS",
            Self::NotSubject => "NS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "IVA" => Some(Self::Vat),
            "IS" => Some(Self::StampDuty),
            "NS" => Some(Self::NotSubject),
            _ => None,
        }
    }
}

/// GeneralLedgerEntries block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedgerEntries {
    pub journals: Vec<Journal>,
}

impl GeneralLedgerEntries {
    /// All transactions across all journals.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.journals.iter().flat_map(|j| j.transactions.iter())
    }
}

/// An accounting journal grouping transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub journal_id: String,
    pub description: String,
    pub transactions: Vec<Transaction>,
}

/// One journal entry — an ordered, non-empty set of debit/credit lines.
///
/// Invariant: debit lines and credit lines sum to the same amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub transaction_date: NaiveDate,
    /// SourceID — originating document number or internal reference.
    pub source_id: String,
    pub description: String,
    pub system_entry_date: NaiveDateTime,
    pub lines: Vec<TransactionLine>,
}

impl Transaction {
    pub fn debit_total(&self) -> Decimal {
        round_amount(self.lines.iter().map(|l| l.debit).sum())
    }

    pub fn credit_total(&self) -> Decimal {
        round_amount(self.lines.iter().map(|l| l.credit).sum())
    }

    pub fn is_balanced(&self) -> bool {
        self.debit_total() == self.credit_total()
    }
}

/// One posting line. Exactly one of `debit`/`credit` is non-zero; the
/// serializer emits both elements with the inactive side as `0.00`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub record_id: String,
    pub account_id: String,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl TransactionLine {
    pub fn debit(record_id: impl Into<String>, account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            record_id: record_id.into(),
            account_id: account_id.into(),
            description: None,
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    pub fn credit(record_id: impl Into<String>, account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            record_id: record_id.into(),
            account_id: account_id.into(),
            description: None,
            debit: Decimal::ZERO,
            credit: amount,
        }
    }
}

/// SourceDocuments block. Order: SalesInvoices, MovementOfGoods,
/// WorkingDocuments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocuments {
    pub sales_invoices: SalesInvoices,
    pub movement_of_goods: Option<MovementOfGoods>,
    pub working_documents: Option<WorkingDocuments>,
}

/// SalesInvoices section with its mandatory summary elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoices {
    pub number_of_entries: u64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub invoices: Vec<SalesInvoice>,
}

/// A sales document with its line items and document totals.
///
/// Invariant: `totals.gross_total == totals.net_total + totals.tax_payable`
/// and `totals.net_total == Σ line.credit_amount`, at 2-decimal precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoice {
    pub invoice_no: String,
    pub status: DocumentStatus,
    /// Digital signature hash chain value, when the issuing software signs.
    pub hash: Option<String>,
    pub invoice_date: NaiveDate,
    pub invoice_type: InvoiceType,
    pub system_entry_date: NaiveDateTime,
    pub customer_id: String,
    pub lines: Vec<InvoiceLine>,
    pub totals: DocumentTotals,
}

impl SalesInvoice {
    pub fn line_net_total(&self) -> Decimal {
        round_amount(self.lines.iter().map(|l| l.credit_amount).sum())
    }
}

/// DocumentStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// N — normal.
    Normal,
    /// A — cancelled (anulado).
    Cancelled,
    /// F — billed (working documents carried into an invoice).
    Billed,
}

impl DocumentStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normal => "N",
            Self::Cancelled => "A",
            Self::Billed => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "N" => Some(Self::Normal),
            "A" => Some(Self::Cancelled),
            "F" => Some(Self::Billed),
            _ => None,
        }
    }
}

/// InvoiceType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    /// FT — invoice.
    Invoice,
    /// FR — invoice-receipt.
    InvoiceReceipt,
    /// NC — credit note.
    CreditNote,
    /// ND — debit note.
    DebitNote,
}

impl InvoiceType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "FT",
            Self::InvoiceReceipt => "FR",
            Self::CreditNote => "NC",
            Self::DebitNote => "ND",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "FT" => Some(Self::Invoice),
            "FR" => Some(Self::InvoiceReceipt),
            "NC" => Some(Self::CreditNote),
            "ND" => Some(Self::DebitNote),
            _ => None,
        }
    }
}

/// A document line item referencing a product and a tax code by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_number: u32,
    pub product_code: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub unit_price: Decimal,
    /// Net line total (quantity × unit price at file precision).
    pub credit_amount: Decimal,
    pub tax: Option<LineTax>,
}

/// Tax applied to a document line, referencing the tax table by code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTax {
    pub tax_type: TaxType,
    pub country_region: String,
    pub tax_code: String,
    pub percentage: Decimal,
}

/// Document-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub tax_payable: Decimal,
    pub net_total: Decimal,
    pub gross_total: Decimal,
}

/// MovementOfGoods section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementOfGoods {
    pub number_of_movement_lines: u64,
    pub total_quantity_issued: Decimal,
    pub movements: Vec<StockMovement>,
}

/// A goods movement document (delivery/transport note).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub document_number: String,
    pub movement_date: NaiveDate,
    pub movement_type: MovementType,
    pub customer_id: Option<String>,
    pub lines: Vec<MovementLine>,
}

/// MovementType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    /// GR — delivery note (guia de remessa).
    Delivery,
    /// GT — transport note (guia de transporte).
    Transport,
    /// GA — asset movement note.
    AssetMovement,
}

impl MovementType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Delivery => "GR",
            Self::Transport => "GT",
            Self::AssetMovement => "GA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "GR" => Some(Self::Delivery),
            "GT" => Some(Self::Transport),
            "GA" => Some(Self::AssetMovement),
            _ => None,
        }
    }
}

/// A goods movement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub line_number: u32,
    pub product_code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// WorkingDocuments section (quotes, proformas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDocuments {
    pub number_of_entries: u64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub documents: Vec<WorkingDocument>,
}

/// A working document — invoice-shaped but without fiscal effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDocument {
    pub document_number: String,
    pub document_date: NaiveDate,
    pub document_type: WorkingDocumentType,
    pub customer_id: String,
    pub lines: Vec<InvoiceLine>,
    pub totals: DocumentTotals,
}

/// WorkingDocumentType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkingDocumentType {
    /// OR — quote (orçamento).
    Quote,
    /// PF — proforma.
    Proforma,
}

impl WorkingDocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Quote => "OR",
            Self::Proforma => "PF",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OR" => Some(Self::Quote),
            "PF" => Some(Self::Proforma),
            _ => None,
        }
    }
}

/// Identification of the software producing the file, reported in the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareInfo {
    pub product_id: String,
    pub product_version: String,
    pub software_certificate_number: String,
    /// Tax ID of the software producer.
    pub product_company_tax_id: String,
}

impl Default for SoftwareInfo {
    fn default() -> Self {
        Self {
            product_id: "saftao".into(),
            product_version: env!("CARGO_PKG_VERSION").into(),
            software_certificate_number: "XXX/AGT/2025".into(),
            product_company_tax_id: String::new(),
        }
    }
}
