//! Extraction of domain records into the typed model.
//!
//! The host system exposes its accounting, sales, and withholding storage
//! through the four source traits below; each trait method is a read-only,
//! restartable query scoped to one company and (where applicable) one
//! reporting period. Extraction validates the raw records: a missing
//! optional field gets a documented default, a missing required field fails
//! the whole run with a [`SaftError::DataIntegrity`] naming the record —
//! partial files are never produced.
//!
//! Sources must present one consistent snapshot of the period; concurrent
//! business writes during a run must not become visible to it (e.g. via a
//! repeatable-read transaction in the host's data layer).

mod documents;
mod ledger;
mod master_data;
mod withholding;

pub use documents::*;
pub use ledger::*;
pub use master_data::*;
pub use withholding::*;

use crate::core::{Journal, Period, SaftError, SourceDocuments, WithholdingTaxEntry};

/// Company reference data: chart of accounts, customers, suppliers,
/// products, and the applicable tax-rate table.
pub trait MasterDataSource: Send + Sync {
    fn company(&self) -> Result<CompanyRecord, SaftError>;
    fn accounts(&self) -> Result<Vec<AccountRecord>, SaftError>;
    fn customers(&self) -> Result<Vec<CustomerRecord>, SaftError>;
    fn suppliers(&self) -> Result<Vec<SupplierRecord>, SaftError>;
    fn products(&self) -> Result<Vec<ProductRecord>, SaftError>;
    fn tax_table(&self) -> Result<Vec<TaxRateRecord>, SaftError>;
}

/// General-ledger transactions for the period.
pub trait LedgerSource: Send + Sync {
    fn transactions(&self, period: Period) -> Result<Vec<TransactionRecord>, SaftError>;
}

/// Source documents for the period.
///
/// `stock_movements` and `working_documents` default to a typed
/// [`SaftError::Unsupported`] failure: a host that has not implemented a
/// block must fail loudly rather than masquerade as an empty period, which
/// would silently corrupt the header totals. Implement them with
/// `Ok(Vec::new())` for a genuinely empty period.
pub trait DocumentsSource: Send + Sync {
    fn sales_invoices(&self, period: Period) -> Result<Vec<InvoiceRecord>, SaftError>;

    fn stock_movements(&self, period: Period) -> Result<Vec<StockMovementRecord>, SaftError> {
        let _ = period;
        Err(SaftError::Unsupported("stock movement extraction".into()))
    }

    fn working_documents(&self, period: Period) -> Result<Vec<WorkingDocumentRecord>, SaftError> {
        let _ = period;
        Err(SaftError::Unsupported("working document extraction".into()))
    }
}

/// Withholding-tax records tied to supplier documents for the period.
pub trait WithholdingSource: Send + Sync {
    fn withholding_entries(&self, period: Period) -> Result<Vec<WithholdingRecord>, SaftError>;
}

/// The combined, validated output of the four extractors — one consistent
/// snapshot of the period, input to the totals aggregator and the document
/// builder.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub master: MasterData,
    pub journals: Vec<Journal>,
    pub documents: SourceDocuments,
    pub withholding: Vec<WithholdingTaxEntry>,
}

pub(crate) fn missing_field(record: impl Into<String>, field: &str) -> SaftError {
    SaftError::DataIntegrity {
        record: record.into(),
        message: format!("missing required field {field}"),
    }
}
