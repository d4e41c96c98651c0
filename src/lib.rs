//! # saftao
//!
//! SAF-T (AO) generation and validation for Angola: extracts accounting,
//! invoicing, and withholding data from a host system, builds the typed
//! audit-file aggregate, serializes it to schema-conformant XML
//! (`urn:OECD:StandardAuditFile-Tax:AO_1.04_01`), and validates the result
//! against the bundled XSD before anything is handed out.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use saftao::core::format::format_amount;
//! use saftao::{Period, TransactionLine};
//!
//! let period = Period::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(period.fiscal_year(), 2024);
//!
//! let line = TransactionLine::debit("1", "31.1.1", dec!(1700));
//! assert_eq!(format_amount(line.debit), "1700.00");
//! assert_eq!(format_amount(line.credit), "0.00");
//! ```
//!
//! The pipeline entry point is [`export::Exporter`]; host systems plug in by
//! implementing the source traits in [`extract`].

pub mod core;
pub mod export;
pub mod extract;
pub mod schema;
pub mod xml;

// Re-export core types at crate root for convenience
pub use crate::core::*;
