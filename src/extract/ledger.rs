//! General-ledger extraction: journal entries with their debit/credit lines.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::{LedgerSource, missing_field};
use crate::core::format::round_amount;
use crate::core::{Journal, Period, SaftError, Transaction, TransactionLine};

/// JournalID of the single journal all entries are grouped under.
pub const GENERAL_JOURNAL_ID: &str = "DiarioGeral";

/// Description of the general journal.
pub const GENERAL_JOURNAL_DESCRIPTION: &str = "Diário Geral de Lançamentos Contábeis";

/// Raw journal entry as stored by the host system.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    /// Originating document number; defaults to the transaction ID.
    pub source_id: Option<String>,
    pub system_entry_date: Option<NaiveDateTime>,
    pub lines: Vec<LedgerLineRecord>,
}

/// Raw posting line. Exactly one of `debit`/`credit` must be set.
#[derive(Debug, Clone, Default)]
pub struct LedgerLineRecord {
    /// Defaults to the 1-based line position.
    pub record_id: Option<String>,
    pub account_id: String,
    pub description: Option<String>,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

/// Read the period's journal entries and group them under the general
/// journal. Balance across lines is enforced later by the document builder;
/// extraction checks per-record shape only.
pub fn extract_ledger(src: &dyn LedgerSource, period: Period) -> Result<Vec<Journal>, SaftError> {
    let records = src.transactions(period)?;
    let mut transactions = Vec::with_capacity(records.len());
    for rec in records {
        transactions.push(convert_transaction(rec, period)?);
    }
    Ok(vec![Journal {
        journal_id: GENERAL_JOURNAL_ID.into(),
        description: GENERAL_JOURNAL_DESCRIPTION.into(),
        transactions,
    }])
}

fn convert_transaction(rec: TransactionRecord, period: Period) -> Result<Transaction, SaftError> {
    if rec.transaction_id.trim().is_empty() {
        return Err(missing_field("Transaction", "TransactionID"));
    }
    let label = format!("Transaction \"{}\"", rec.transaction_id);

    if !period.contains(rec.transaction_date) {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: format!(
                "transaction date {} is outside the reporting period {}..{}",
                rec.transaction_date,
                period.start(),
                period.end()
            ),
        });
    }
    if rec.lines.is_empty() {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "journal entry has no lines".into(),
        });
    }

    let mut lines = Vec::with_capacity(rec.lines.len());
    for (i, line) in rec.lines.into_iter().enumerate() {
        lines.push(convert_line(&rec.transaction_id, i, line)?);
    }

    Ok(Transaction {
        source_id: rec
            .source_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| rec.transaction_id.clone()),
        system_entry_date: rec
            .system_entry_date
            .unwrap_or_else(|| rec.transaction_date.and_time(NaiveTime::MIN)),
        transaction_id: rec.transaction_id,
        transaction_date: rec.transaction_date,
        description: rec.description.unwrap_or_default(),
        lines,
    })
}

fn convert_line(
    transaction_id: &str,
    index: usize,
    line: LedgerLineRecord,
) -> Result<TransactionLine, SaftError> {
    let label = format!("Transaction \"{transaction_id}\" line {}", index + 1);

    if line.account_id.trim().is_empty() {
        return Err(missing_field(label, "AccountID"));
    }

    let (debit, credit) = match (line.debit, line.credit) {
        (Some(d), None) => (d, Decimal::ZERO),
        (None, Some(c)) => (Decimal::ZERO, c),
        (Some(_), Some(_)) => {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: "line carries both DebitAmount and CreditAmount".into(),
            });
        }
        (None, None) => {
            return Err(SaftError::DataIntegrity {
                record: label,
                message: "line carries neither DebitAmount nor CreditAmount".into(),
            });
        }
    };
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Err(SaftError::DataIntegrity {
            record: label,
            message: "negative posting amount".into(),
        });
    }

    Ok(TransactionLine {
        record_id: line
            .record_id
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| (index + 1).to_string()),
        account_id: line.account_id,
        description: line.description,
        debit: round_amount(debit),
        credit: round_amount(credit),
    })
}
