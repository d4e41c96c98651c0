use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;

use saftao::export::{
    CancelToken, ExportOptions, ExportRequest, Exporter, Sources, Stage,
};
use saftao::extract::*;
use saftao::schema::SchemaValidator;
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

/// In-memory host system with one month of consistent data.
#[derive(Clone)]
struct Host {
    ledger_delay: Option<Duration>,
}

impl Host {
    fn new() -> Self {
        Self { ledger_delay: None }
    }
}

impl MasterDataSource for Host {
    fn company(&self) -> Result<CompanyRecord, SaftError> {
        Ok(CompanyRecord {
            tax_id: "5417011548".into(),
            name: "Luanda Comércio Lda".into(),
            street: Some("Rua da Missão 12".into()),
            city: Some("Luanda".into()),
            province: Some("Luanda".into()),
            ..Default::default()
        })
    }

    fn accounts(&self) -> Result<Vec<AccountRecord>, SaftError> {
        Ok(["11", "21", "71"]
            .into_iter()
            .map(|id| AccountRecord {
                account_id: id.into(),
                description: Some(format!("Conta {id}")),
                ..Default::default()
            })
            .collect())
    }

    fn customers(&self) -> Result<Vec<CustomerRecord>, SaftError> {
        Ok(vec![CustomerRecord {
            customer_id: "C001".into(),
            account_id: Some("21".into()),
            name: Some("Cliente Exemplo".into()),
            city: Some("Benguela".into()),
            ..Default::default()
        }])
    }

    fn suppliers(&self) -> Result<Vec<SupplierRecord>, SaftError> {
        Ok(vec![SupplierRecord {
            supplier_id: "S001".into(),
            tax_id: Some("5000412331".into()),
            name: Some("Fornecedor Exemplo".into()),
            city: Some("Luanda".into()),
            ..Default::default()
        }])
    }

    fn products(&self) -> Result<Vec<ProductRecord>, SaftError> {
        Ok(vec![
            ProductRecord {
                product_code: "P001".into(),
                description: Some("Fuba de milho".into()),
                ..Default::default()
            },
            ProductRecord {
                product_code: "SRV1".into(),
                product_type: Some(ProductType::Service),
                description: Some("Serviço de entrega".into()),
                ..Default::default()
            },
        ])
    }

    fn tax_table(&self) -> Result<Vec<TaxRateRecord>, SaftError> {
        Ok(vec![TaxRateRecord {
            tax_code: "NOR".into(),
            description: Some("Taxa normal".into()),
            percentage: dec!(14),
            ..Default::default()
        }])
    }
}

impl LedgerSource for Host {
    fn transactions(&self, _period: Period) -> Result<Vec<TransactionRecord>, SaftError> {
        if let Some(delay) = self.ledger_delay {
            std::thread::sleep(delay);
        }
        Ok(vec![TransactionRecord {
            transaction_id: "T-2024-001".into(),
            transaction_date: date(2024, 1, 15),
            description: Some("venda a crédito".into()),
            source_id: Some("FT 1/2024".into()),
            system_entry_date: None,
            lines: vec![
                LedgerLineRecord {
                    account_id: "21".into(),
                    debit: Some(dec!(399.57)),
                    ..Default::default()
                },
                LedgerLineRecord {
                    account_id: "71".into(),
                    credit: Some(dec!(399.57)),
                    ..Default::default()
                },
            ],
        }])
    }
}

impl DocumentsSource for Host {
    fn sales_invoices(&self, _period: Period) -> Result<Vec<InvoiceRecord>, SaftError> {
        Ok(vec![InvoiceRecord {
            invoice_no: "FT 1/2024".into(),
            invoice_date: date(2024, 1, 10),
            invoice_type: None,
            status: None,
            hash: None,
            system_entry_date: None,
            customer_id: Some("C001".into()),
            lines: vec![
                InvoiceLineRecord {
                    product_code: "P001".into(),
                    quantity: dec!(2),
                    unit_price: dec!(100.00),
                    tax: Some(LineTaxRecord {
                        tax_code: "NOR".into(),
                        percentage: dec!(14),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                InvoiceLineRecord {
                    product_code: "SRV1".into(),
                    quantity: dec!(1),
                    unit_price: dec!(150.50),
                    tax: Some(LineTaxRecord {
                        tax_code: "NOR".into(),
                        percentage: dec!(14),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            totals: None,
        }])
    }

    fn stock_movements(&self, _period: Period) -> Result<Vec<StockMovementRecord>, SaftError> {
        Ok(vec![StockMovementRecord {
            document_number: "GR 1/2024".into(),
            movement_date: date(2024, 1, 11),
            movement_type: None,
            customer_id: Some("C001".into()),
            lines: vec![MovementLineRecord {
                product_code: "P001".into(),
                quantity: dec!(2),
                unit_price: Some(dec!(100.00)),
            }],
        }])
    }

    fn working_documents(&self, _period: Period) -> Result<Vec<WorkingDocumentRecord>, SaftError> {
        Ok(vec![])
    }
}

impl WithholdingSource for Host {
    fn withholding_entries(&self, _period: Period) -> Result<Vec<WithholdingRecord>, SaftError> {
        Ok(vec![WithholdingRecord {
            code: "IRT".into(),
            description: Some("Retenção serviços".into()),
            income_type: None,
            source_document_id: "FTF 9/2024".into(),
            supplier_id: Some("S001".into()),
            taxable_base: dec!(1000.00),
            rate: dec!(6.5),
            amount: dec!(65.00),
        }])
    }
}

fn sources(host: Host) -> Sources {
    let host = Arc::new(host);
    Sources {
        master: host.clone(),
        ledger: host.clone(),
        documents: host.clone(),
        withholding: host,
    }
}

fn options() -> ExportOptions {
    ExportOptions {
        created_at: Some(created()),
        ..Default::default()
    }
}

#[test]
fn end_to_end_run_produces_a_validated_file() {
    let validator = SchemaValidator::bundled().unwrap();
    let exporter = Exporter::new(sources(Host::new()), validator);
    let outcome = exporter
        .run(&ExportRequest::new(january()), &options())
        .unwrap();

    let header = &outcome.audit_file.header;
    assert_eq!(header.totals.total_debit, dec!(399.57));
    assert_eq!(header.totals.total_credit, dec!(399.57));
    assert_eq!(header.totals.total_sales_invoices, dec!(399.57));
    assert_eq!(header.totals.number_of_entries, 1);

    assert!(outcome.xml.contains("<InvoiceNo>FT 1/2024</InvoiceNo>"));
    assert!(outcome.xml.contains("<DocumentNumber>GR 1/2024</DocumentNumber>"));
    // Empty working documents never become an empty section.
    assert!(!outcome.xml.contains("<WorkingDocuments>"));

    // The returned XML re-validates as a fixed point.
    validator.validate(&outcome.xml).unwrap();
}

#[test]
fn parallel_and_sequential_runs_produce_identical_output() {
    let validator = SchemaValidator::bundled().unwrap();
    let exporter = Exporter::new(sources(Host::new()), validator);
    let request = ExportRequest::new(january());

    let sequential = exporter.run(&request, &options()).unwrap();
    let parallel = exporter
        .run(
            &request,
            &ExportOptions {
                parallel: true,
                ..options()
            },
        )
        .unwrap();
    assert_eq!(sequential.xml, parallel.xml);
}

#[test]
fn unsupported_source_block_fails_the_collecting_stage() {
    // A host that only implements invoices: the trait defaults make the
    // missing blocks loud.
    struct InvoicesOnly(Host);
    impl DocumentsSource for InvoicesOnly {
        fn sales_invoices(&self, period: Period) -> Result<Vec<InvoiceRecord>, SaftError> {
            self.0.sales_invoices(period)
        }
    }

    let host = Arc::new(Host::new());
    let srcs = Sources {
        master: host.clone(),
        ledger: host.clone(),
        documents: Arc::new(InvoicesOnly(Host::new())),
        withholding: host,
    };
    let validator = SchemaValidator::bundled().unwrap();
    let err = Exporter::new(srcs, validator)
        .run(&ExportRequest::new(january()), &options())
        .unwrap_err();

    assert_eq!(err.stage, Stage::Collecting);
    assert!(matches!(err.error, SaftError::Unsupported(_)));
    assert!(err.error.to_string().contains("stock movement"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn slow_extractor_times_out() {
    let host = Host {
        ledger_delay: Some(Duration::from_millis(500)),
    };
    let validator = SchemaValidator::bundled().unwrap();
    let err = Exporter::new(sources(host), validator)
        .run(
            &ExportRequest::new(january()),
            &ExportOptions {
                timeout: Some(Duration::from_millis(30)),
                ..options()
            },
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Collecting);
    assert!(matches!(err.error, SaftError::Timeout(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn cancelled_run_stops_at_the_first_stage_boundary() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let validator = SchemaValidator::bundled().unwrap();
    let err = Exporter::new(sources(Host::new()), validator)
        .run(
            &ExportRequest::new(january()),
            &ExportOptions {
                cancel,
                ..options()
            },
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Collecting);
    assert!(matches!(err.error, SaftError::Cancelled));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn referential_failure_surfaces_from_the_building_stage() {
    struct BadLedger(Host);
    impl LedgerSource for BadLedger {
        fn transactions(&self, period: Period) -> Result<Vec<TransactionRecord>, SaftError> {
            let mut records = self.0.transactions(period)?;
            records[0].lines[0].account_id = "999".into();
            Ok(records)
        }
    }

    let host = Arc::new(Host::new());
    let srcs = Sources {
        master: host.clone(),
        ledger: Arc::new(BadLedger(Host::new())),
        documents: host.clone(),
        withholding: host,
    };
    let validator = SchemaValidator::bundled().unwrap();
    let err = Exporter::new(srcs, validator)
        .run(&ExportRequest::new(january()), &options())
        .unwrap_err();

    assert_eq!(err.stage, Stage::Building);
    assert!(err.error.to_string().contains("999"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn outcome_writes_the_document_to_disk() {
    let validator = SchemaValidator::bundled().unwrap();
    let exporter = Exporter::new(sources(Host::new()), validator);
    let outcome = exporter
        .run(&ExportRequest::new(january()), &options())
        .unwrap();

    let path = std::env::temp_dir().join(format!("saftao-test-{}.xml", std::process::id()));
    outcome.write_to(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, outcome.xml);
    let _ = std::fs::remove_file(&path);
}
