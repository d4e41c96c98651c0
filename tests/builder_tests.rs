use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;

use saftao::export::{aggregate_totals, build_audit_file};
use saftao::extract::{CompanyProfile, Extraction, MasterData};
use saftao::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn created() -> NaiveDateTime {
    date(2024, 2, 5).and_hms_opt(8, 30, 0).unwrap()
}

fn january() -> Period {
    Period::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap()
}

fn account(id: &str) -> Account {
    Account {
        account_id: id.into(),
        account_description: format!("Conta {id}"),
        opening_debit_balance: dec!(0.00),
        opening_credit_balance: dec!(0.00),
        closing_debit_balance: dec!(0.00),
        closing_credit_balance: dec!(0.00),
    }
}

fn address() -> Address {
    Address {
        street_name: Some("Rua da Missão 12".into()),
        city: "Luanda".into(),
        postal_code: None,
        province: Some("Luanda".into()),
        country: "AO".into(),
    }
}

fn customer(id: &str) -> Customer {
    Customer {
        customer_id: id.into(),
        account_id: "200".into(),
        tax_id: "999999999".into(),
        name: format!("Cliente {id}"),
        billing_address: address(),
        self_billing: false,
    }
}

fn supplier(id: &str) -> Supplier {
    Supplier {
        supplier_id: id.into(),
        account_id: "300".into(),
        tax_id: "5000412331".into(),
        name: format!("Fornecedor {id}"),
        billing_address: address(),
        self_billing: false,
    }
}

fn product(code: &str) -> Product {
    Product {
        product_type: ProductType::Goods,
        product_code: code.into(),
        product_group: None,
        description: format!("Produto {code}"),
        product_number_code: code.into(),
    }
}

fn master() -> MasterData {
    MasterData {
        company: CompanyProfile {
            company_id: "5417011548".into(),
            tax_id: "5417011548".into(),
            name: "Luanda Comércio Lda".into(),
            business_name: None,
            address: address(),
            currency_code: "AOA".into(),
            tax_accounting_basis: TaxAccountingBasis::Invoicing,
            tax_entity: "Global".into(),
        },
        accounts: vec![account("100"), account("200"), account("300"), account("500")],
        customers: vec![customer("C001")],
        suppliers: vec![supplier("S001")],
        products: vec![product("P001")],
        tax_table: vec![TaxTableEntry {
            tax_type: TaxType::Vat,
            tax_code: "NOR".into(),
            description: "Taxa normal".into(),
            country_region: "AO".into(),
            percentage: dec!(14),
        }],
    }
}

fn transaction(id: &str, debit_account: &str, credit_account: &str) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        transaction_date: date(2024, 1, 15),
        source_id: id.into(),
        description: "lançamento".into(),
        system_entry_date: date(2024, 1, 15).and_hms_opt(10, 0, 0).unwrap(),
        lines: vec![
            TransactionLine::debit("1", debit_account, dec!(500)),
            TransactionLine::credit("2", credit_account, dec!(500)),
        ],
    }
}

fn invoice_line(amount: rust_decimal::Decimal) -> InvoiceLine {
    InvoiceLine {
        line_number: 1,
        product_code: "P001".into(),
        description: None,
        quantity: dec!(1),
        unit_of_measure: "UN".into(),
        unit_price: amount,
        credit_amount: amount,
        tax: Some(LineTax {
            tax_type: TaxType::Vat,
            country_region: "AO".into(),
            tax_code: "NOR".into(),
            percentage: dec!(14),
        }),
    }
}

fn invoice(no: &str, net: rust_decimal::Decimal) -> SalesInvoice {
    let tax = saftao::core::format::round_amount(net * dec!(0.14));
    SalesInvoice {
        invoice_no: no.into(),
        status: DocumentStatus::Normal,
        hash: None,
        invoice_date: date(2024, 1, 10),
        invoice_type: InvoiceType::Invoice,
        system_entry_date: date(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap(),
        customer_id: "C001".into(),
        lines: vec![invoice_line(net)],
        totals: DocumentTotals {
            tax_payable: tax,
            net_total: net,
            gross_total: net + tax,
        },
    }
}

fn extraction() -> Extraction {
    Extraction {
        master: master(),
        journals: vec![Journal {
            journal_id: "DiarioGeral".into(),
            description: "Diário Geral".into(),
            transactions: vec![transaction("T-1", "100", "500")],
        }],
        documents: SourceDocuments {
            sales_invoices: SalesInvoices {
                number_of_entries: 1,
                total_debit: dec!(114.00),
                total_credit: dec!(114.00),
                invoices: vec![invoice("FT 1/2024", dec!(100.00))],
            },
            movement_of_goods: None,
            working_documents: None,
        },
        withholding: vec![WithholdingTaxEntry {
            code: "IRT".into(),
            description: "Retenção serviços".into(),
            income_type: WithholdingIncomeType::Services,
            source_document_id: "FTF 9/2024".into(),
            supplier_id: Some("S001".into()),
            taxable_base: dec!(1000.00),
            rate: dec!(6.5),
            amount: dec!(65.00),
        }],
    }
}

fn build(ext: Extraction) -> Result<AuditFile, SaftError> {
    let totals = aggregate_totals(&ext);
    build_audit_file(ext, totals, january(), &SoftwareInfo::default(), created())
}

#[test]
fn builds_a_complete_header() {
    let file = build(extraction()).unwrap();
    let header = &file.header;
    assert_eq!(header.audit_file_version, "1.04_01");
    assert_eq!(header.company_id, "5417011548");
    assert_eq!(header.fiscal_year, 2024);
    assert_eq!(header.start_date, date(2024, 1, 1));
    assert_eq!(header.end_date, date(2024, 1, 31));
    assert_eq!(header.currency_code, "AOA");
    assert_eq!(header.date_created, created());
    assert_eq!(header.product_id, "saftao");
    // An empty producer tax ID falls back to the company's own.
    assert_eq!(header.product_company_tax_id, "5417011548");
    assert_eq!(header.totals.total_debit, dec!(500.00));
    assert_eq!(header.totals.total_credit, dec!(500.00));
    assert_eq!(header.totals.total_sales_invoices, dec!(114.00));
    assert_eq!(header.totals.number_of_entries, 1);
}

#[test]
fn ledger_line_referencing_an_unknown_account_fails() {
    // Accounts "100".."500" exist; "999" does not.
    let mut ext = extraction();
    ext.journals[0].transactions[0].lines[0].account_id = "999".into();
    let err = build(ext).unwrap_err();
    match err {
        SaftError::ReferentialIntegrity { kind, id, referrer } => {
            assert_eq!(kind, "AccountID");
            assert_eq!(id, "999");
            assert!(referrer.contains("T-1"));
        }
        other => panic!("expected referential integrity error, got {other}"),
    }
}

#[test]
fn unbalanced_transaction_fails() {
    let mut ext = extraction();
    ext.journals[0].transactions[0].lines[1].credit = dec!(499.99);
    let err = build(ext).unwrap_err();
    assert!(matches!(err, SaftError::DataIntegrity { .. }));
    assert!(err.to_string().contains("does not equal credit total"));
}

#[test]
fn duplicate_customer_id_fails() {
    let mut ext = extraction();
    ext.master.customers.push(customer("C001"));
    let err = build(ext).unwrap_err();
    assert!(err.to_string().contains("duplicate CustomerID"));
}

#[test]
fn invoice_referencing_an_unknown_customer_fails() {
    let mut ext = extraction();
    ext.documents.sales_invoices.invoices[0].customer_id = "C999".into();
    let err = build(ext).unwrap_err();
    assert!(matches!(
        err,
        SaftError::ReferentialIntegrity { kind: "CustomerID", .. }
    ));
    assert!(err.to_string().contains("C999"));
}

#[test]
fn invoice_line_referencing_an_unknown_tax_code_fails() {
    let mut ext = extraction();
    ext.documents.sales_invoices.invoices[0].lines[0]
        .tax
        .as_mut()
        .unwrap()
        .tax_code = "ISE".into();
    let err = build(ext).unwrap_err();
    assert!(matches!(err, SaftError::ReferentialIntegrity { kind: "TaxCode", .. }));
}

#[test]
fn invoice_net_total_must_match_the_lines() {
    let mut ext = extraction();
    ext.documents.sales_invoices.invoices[0].totals.net_total = dec!(99.99);
    let err = build(ext).unwrap_err();
    assert!(err.to_string().contains("NetTotal"));
}

#[test]
fn invoice_gross_total_must_match_net_plus_tax() {
    let mut ext = extraction();
    ext.documents.sales_invoices.invoices[0].totals.gross_total = dec!(100.00);
    let err = build(ext).unwrap_err();
    assert!(err.to_string().contains("GrossTotal"));
}

#[test]
fn withholding_amount_mismatch_fails_before_serialization() {
    // Base 1000.00 at 6.5% implies 65.00; a stored 60.00 is rejected.
    let mut ext = extraction();
    ext.withholding[0].amount = dec!(60.00);
    let err = build(ext).unwrap_err();
    assert!(matches!(err, SaftError::DataIntegrity { .. }));
    let message = err.to_string();
    assert!(message.contains("60.00"));
    assert!(message.contains("65.00"));
}

#[test]
fn withholding_referencing_an_unknown_supplier_fails() {
    let mut ext = extraction();
    ext.withholding[0].supplier_id = Some("S999".into());
    let err = build(ext).unwrap_err();
    assert!(matches!(
        err,
        SaftError::ReferentialIntegrity { kind: "SupplierID", .. }
    ));
}

#[test]
fn withholding_entries_land_in_master_files() {
    let file = build(extraction()).unwrap();
    assert_eq!(file.master_files.withholding_tax.len(), 1);
    assert_eq!(file.master_files.withholding_tax[0].code, "IRT");
}

#[test]
fn movement_referencing_an_unknown_product_fails() {
    let mut ext = extraction();
    ext.documents.movement_of_goods = Some(MovementOfGoods {
        number_of_movement_lines: 1,
        total_quantity_issued: dec!(2),
        movements: vec![StockMovement {
            document_number: "GR 1/2024".into(),
            movement_date: date(2024, 1, 20),
            movement_type: MovementType::Delivery,
            customer_id: Some("C001".into()),
            lines: vec![MovementLine {
                line_number: 1,
                product_code: "P999".into(),
                quantity: dec!(2),
                unit_price: dec!(100.00),
            }],
        }],
    });
    let err = build(ext).unwrap_err();
    assert!(matches!(
        err,
        SaftError::ReferentialIntegrity { kind: "ProductCode", .. }
    ));
}
