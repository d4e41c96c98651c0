//! Property-based tests for the arithmetic and formatting invariants.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use saftao::core::format::{format_amount, round_amount};
use saftao::export::aggregate_totals;
use saftao::extract::{CompanyProfile, Extraction, MasterData};
use saftao::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    // Mantissa up to 10^12 with 0..=4 decimal places.
    (-1_000_000_000_000i64..1_000_000_000_000i64, 0u32..=4).prop_map(|(m, s)| Decimal::new(m, s))
}

fn positive_amounts() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(
        (1i64..1_000_000_000, 0u32..=2).prop_map(|(m, s)| Decimal::new(m, s)),
        1..20,
    )
}

fn extraction(journals: Vec<Journal>) -> Extraction {
    Extraction {
        master: MasterData {
            company: CompanyProfile {
                company_id: "5417011548".into(),
                tax_id: "5417011548".into(),
                name: "Luanda Comércio Lda".into(),
                business_name: None,
                address: Address {
                    street_name: None,
                    city: "Luanda".into(),
                    postal_code: None,
                    province: None,
                    country: "AO".into(),
                },
                currency_code: "AOA".into(),
                tax_accounting_basis: TaxAccountingBasis::Invoicing,
                tax_entity: "Global".into(),
            },
            accounts: vec![],
            customers: vec![],
            suppliers: vec![],
            products: vec![],
            tax_table: vec![],
        },
        journals,
        documents: SourceDocuments {
            sales_invoices: SalesInvoices {
                number_of_entries: 0,
                total_debit: dec!(0),
                total_credit: dec!(0),
                invoices: vec![],
            },
            movement_of_goods: None,
            working_documents: None,
        },
        withholding: vec![],
    }
}

proptest! {
    #[test]
    fn format_amount_always_has_two_decimals(d in amount_strategy()) {
        let s = format_amount(d);
        let (_, frac) = s.split_once('.').expect("decimal point");
        prop_assert_eq!(frac.len(), 2);
        prop_assert!(frac.bytes().all(|b| b.is_ascii_digit()));
        // The rendered text parses back to the rounded value.
        let parsed: Decimal = s.parse().unwrap();
        prop_assert_eq!(parsed, round_amount(d));
    }

    #[test]
    fn round_amount_is_idempotent(d in amount_strategy()) {
        prop_assert_eq!(round_amount(round_amount(d)), round_amount(d));
    }

    #[test]
    fn mirrored_postings_always_balance(amounts in positive_amounts()) {
        let total: Decimal = amounts.iter().sum();
        let mut lines: Vec<TransactionLine> = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| TransactionLine::debit((i + 1).to_string(), "11", a))
            .collect();
        lines.push(TransactionLine::credit(
            (lines.len() + 1).to_string(),
            "71",
            total,
        ));
        let transaction = Transaction {
            transaction_id: "T-1".into(),
            transaction_date: date(2024, 1, 15),
            source_id: "T-1".into(),
            description: String::new(),
            system_entry_date: date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap(),
            lines,
        };
        prop_assert!(transaction.is_balanced());

        // Header totals then agree on both sides.
        let journal = Journal {
            journal_id: "DiarioGeral".into(),
            description: "Diário Geral".into(),
            transactions: vec![transaction],
        };
        let totals = aggregate_totals(&extraction(vec![journal]));
        prop_assert_eq!(totals.total_debit, totals.total_credit);
        prop_assert_eq!(totals.number_of_entries, 1);
    }

    #[test]
    fn withholding_amount_matches_manual_rounding(
        base in (0i64..100_000_000, 0u32..=2).prop_map(|(m, s)| Decimal::new(m, s)),
        rate in (0i64..10_000, 0u32..=2).prop_map(|(m, s)| Decimal::new(m, s)),
    ) {
        let entry = WithholdingTaxEntry {
            code: "IRT".into(),
            description: "IRT".into(),
            income_type: WithholdingIncomeType::Services,
            source_document_id: "FTF 1/2024".into(),
            supplier_id: None,
            taxable_base: base,
            rate,
            amount: dec!(0),
        };
        prop_assert_eq!(
            entry.expected_amount(),
            round_amount(base * rate / dec!(100))
        );
    }

    #[test]
    fn totals_are_a_pure_function_of_the_input(amount in 1i64..1_000_000) {
        let a = Decimal::new(amount, 2);
        let journal = Journal {
            journal_id: "DiarioGeral".into(),
            description: "Diário Geral".into(),
            transactions: vec![Transaction {
                transaction_id: "T-1".into(),
                transaction_date: date(2024, 1, 15),
                source_id: "T-1".into(),
                description: String::new(),
                system_entry_date: date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap(),
                lines: vec![
                    TransactionLine::debit("1", "11", a),
                    TransactionLine::credit("2", "71", a),
                ],
            }],
        };
        let ext = extraction(vec![journal]);
        prop_assert_eq!(aggregate_totals(&ext), aggregate_totals(&ext));
        prop_assert_eq!(aggregate_totals(&ext).total_debit, round_amount(a));
    }
}
