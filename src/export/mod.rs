//! End-to-end export pipeline for one (company, period) run.
//!
//! The orchestrator walks a strictly sequential state machine —
//! Collecting → Aggregating → Building → Serializing → Validating → Done —
//! with a terminal Failed state reachable from any stage. On failure the
//! caller receives the originating stage and the specific error; a
//! half-built or half-serialized file is never returned.
//!
//! The four extractors have no dependency on one another and may run
//! concurrently (`ExportOptions::parallel`); all four join before
//! aggregation starts. Each extractor call runs under the configured
//! timeout, and the run can be cancelled cooperatively at stage boundaries.

mod builder;
mod totals;

pub use builder::*;
pub use totals::*;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

use crate::core::{AuditFile, Period, SaftError, SoftwareInfo};
use crate::extract::{
    DocumentsSource, Extraction, LedgerSource, MasterDataSource, WithholdingSource,
    extract_documents, extract_ledger, extract_master_data, extract_withholding,
};
use crate::schema::SchemaValidator;
use crate::xml::to_saft_xml;

/// Pipeline stages, reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collecting,
    Aggregating,
    Building,
    Serializing,
    Validating,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Collecting => "Collecting",
            Self::Aggregating => "Aggregating",
            Self::Building => "Building",
            Self::Serializing => "Serializing",
            Self::Validating => "Validating",
        })
    }
}

/// A failed run: the stage that failed plus the originating error.
#[derive(Debug, Error)]
#[error("export failed during {stage}: {error}")]
pub struct ExportError {
    pub stage: Stage,
    pub error: SaftError,
}

impl ExportError {
    /// Exit code for the external job trigger (see [`SaftError::exit_code`]).
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

/// The domain stores one run reads from. Handles are shared so extractor
/// calls can run on worker threads; sources are read-only by contract.
#[derive(Clone)]
pub struct Sources {
    pub master: Arc<dyn MasterDataSource>,
    pub ledger: Arc<dyn LedgerSource>,
    pub documents: Arc<dyn DocumentsSource>,
    pub withholding: Arc<dyn WithholdingSource>,
}

/// Parameters of one generation run.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub period: Period,
    pub software: SoftwareInfo,
}

impl ExportRequest {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            software: SoftwareInfo::default(),
        }
    }
}

/// Run options: extractor time budget, extractor-level parallelism,
/// cooperative cancellation, and an injectable creation timestamp for
/// reproducible output.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Budget per extractor call; a call that exceeds it fails the run
    /// with [`SaftError::Timeout`] instead of hanging.
    pub timeout: Option<Duration>,
    /// Fan out the four extractors onto worker threads, joining before
    /// aggregation.
    pub parallel: bool,
    pub cancel: CancelToken,
    /// DateCreated for the header; defaults to the current UTC time.
    pub created_at: Option<NaiveDateTime>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(120)),
            parallel: false,
            cancel: CancelToken::new(),
            created_at: None,
        }
    }
}

/// Cooperative cancellation flag, checked at each stage boundary.
/// Cancellation mid-extraction is not guaranteed; an in-flight extractor
/// call may complete before the flag is honored.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A successful run: the typed aggregate and its validated XML rendering.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub audit_file: AuditFile,
    pub xml: String,
}

impl ExportOutcome {
    /// Write the validated XML to the caller-specified path.
    pub fn write_to(&self, path: &Path) -> Result<(), SaftError> {
        std::fs::write(path, self.xml.as_bytes()).map_err(|e| {
            SaftError::Infrastructure(format!("failed to write {}: {e}", path.display()))
        })
    }
}

/// The pipeline orchestrator. Holds shared source handles and a reference
/// to the process-wide schema validator.
pub struct Exporter<'v> {
    sources: Sources,
    validator: &'v SchemaValidator,
}

impl<'v> Exporter<'v> {
    pub fn new(sources: Sources, validator: &'v SchemaValidator) -> Self {
        Self { sources, validator }
    }

    /// Run the pipeline end to end. Returns either a validated file or the
    /// failing stage with its error — never a partial result.
    pub fn run(
        &self,
        request: &ExportRequest,
        options: &ExportOptions,
    ) -> Result<ExportOutcome, ExportError> {
        let period = request.period;

        guard(Stage::Collecting, &options.cancel)?;
        tracing::info!(start = %period.start(), end = %period.end(), "collecting extractor outputs");
        let extraction = self
            .collect(period, options)
            .map_err(|error| ExportError {
                stage: Stage::Collecting,
                error,
            })?;

        guard(Stage::Aggregating, &options.cancel)?;
        let totals = aggregate_totals(&extraction);
        tracing::debug!(
            entries = totals.number_of_entries,
            total_debit = %totals.total_debit,
            "header totals aggregated"
        );

        guard(Stage::Building, &options.cancel)?;
        let created = options
            .created_at
            .unwrap_or_else(|| Utc::now().naive_utc());
        let audit_file = build_audit_file(extraction, totals, period, &request.software, created)
            .map_err(|error| ExportError {
                stage: Stage::Building,
                error,
            })?;

        guard(Stage::Serializing, &options.cancel)?;
        let xml = to_saft_xml(&audit_file).map_err(|error| ExportError {
            stage: Stage::Serializing,
            error,
        })?;

        guard(Stage::Validating, &options.cancel)?;
        self.validator.validate(&xml).map_err(|error| ExportError {
            stage: Stage::Validating,
            error,
        })?;
        tracing::info!(bytes = xml.len(), "audit file rendered and validated");

        Ok(ExportOutcome { audit_file, xml })
    }

    fn collect(&self, period: Period, options: &ExportOptions) -> Result<Extraction, SaftError> {
        if options.parallel {
            // Fan-out/fan-in: one shared deadline, all four join here.
            let deadline = options.timeout.map(|t| Instant::now() + t);
            let master_rx = spawn_worker("master-data", {
                let src = Arc::clone(&self.sources.master);
                move || extract_master_data(src.as_ref())
            });
            let ledger_rx = spawn_worker("ledger", {
                let src = Arc::clone(&self.sources.ledger);
                move || extract_ledger(src.as_ref(), period)
            });
            let documents_rx = spawn_worker("documents", {
                let src = Arc::clone(&self.sources.documents);
                move || extract_documents(src.as_ref(), period)
            });
            let withholding_rx = spawn_worker("withholding", {
                let src = Arc::clone(&self.sources.withholding);
                move || extract_withholding(src.as_ref(), period)
            });

            let master = recv_result(master_rx, deadline, "master data extraction")?;
            let journals = recv_result(ledger_rx, deadline, "ledger extraction")?;
            let documents = recv_result(documents_rx, deadline, "document extraction")?;
            let withholding = recv_result(withholding_rx, deadline, "withholding extraction")?;
            Ok(Extraction {
                master,
                journals,
                documents,
                withholding,
            })
        } else {
            // Sequential, each call under its own time budget.
            let master = self.timed("master data extraction", options.timeout, {
                let src = Arc::clone(&self.sources.master);
                move || extract_master_data(src.as_ref())
            })?;
            let journals = self.timed("ledger extraction", options.timeout, {
                let src = Arc::clone(&self.sources.ledger);
                move || extract_ledger(src.as_ref(), period)
            })?;
            let documents = self.timed("document extraction", options.timeout, {
                let src = Arc::clone(&self.sources.documents);
                move || extract_documents(src.as_ref(), period)
            })?;
            let withholding = self.timed("withholding extraction", options.timeout, {
                let src = Arc::clone(&self.sources.withholding);
                move || extract_withholding(src.as_ref(), period)
            })?;
            Ok(Extraction {
                master,
                journals,
                documents,
                withholding,
            })
        }
    }

    fn timed<T, F>(
        &self,
        label: &'static str,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<T, SaftError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SaftError> + Send + 'static,
    {
        match timeout {
            None => f(),
            Some(limit) => {
                let deadline = Some(Instant::now() + limit);
                recv_result(spawn_worker(label, f), deadline, label)
            }
        }
    }
}

fn guard(stage: Stage, cancel: &CancelToken) -> Result<(), ExportError> {
    if cancel.is_cancelled() {
        tracing::warn!(%stage, "run cancelled at stage boundary");
        Err(ExportError {
            stage,
            error: SaftError::Cancelled,
        })
    } else {
        Ok(())
    }
}

/// Run an extractor on a detached worker thread. A worker that outlives its
/// timeout is abandoned; its result is discarded when the receiver drops.
fn spawn_worker<T, F>(label: &str, f: F) -> mpsc::Receiver<Result<T, SaftError>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SaftError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("saftao-{label}"))
        .spawn(move || {
            let _ = tx.send(f());
        });
    if spawned.is_err() {
        // tx was dropped with the closure; the receiver will report the
        // disconnect as an infrastructure failure.
        tracing::error!(label, "failed to spawn extractor worker");
    }
    rx
}

fn recv_result<T>(
    rx: mpsc::Receiver<Result<T, SaftError>>,
    deadline: Option<Instant>,
    label: &str,
) -> Result<T, SaftError> {
    match deadline {
        None => rx.recv().map_err(|_| {
            SaftError::Infrastructure(format!("{label} worker terminated unexpectedly"))
        })?,
        Some(d) => {
            let remaining = d.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(SaftError::Timeout(format!(
                    "{label} did not complete within the configured budget"
                ))),
                Err(RecvTimeoutError::Disconnected) => Err(SaftError::Infrastructure(format!(
                    "{label} worker terminated unexpectedly"
                ))),
            }
        }
    }
}
