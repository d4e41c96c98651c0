use thiserror::Error;

/// Errors that can occur while generating or validating a SAF-T file.
///
/// The variants mirror the failure classes of the export pipeline: bad run
/// parameters, broken source records, unresolvable cross-references,
/// serializer-internal faults, schema rejections, and infrastructure faults
/// (schema loading, extractor timeouts, output I/O).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SaftError {
    /// Invalid input parameters (inverted period, unknown company).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required field is missing or inconsistent in a source record.
    #[error("data integrity error in {record}: {message}")]
    DataIntegrity { record: String, message: String },

    /// A cross-section reference cannot be resolved against master data.
    #[error("referential integrity error: {referrer} references unknown {kind} \"{id}\"")]
    ReferentialIntegrity {
        referrer: String,
        kind: &'static str,
        id: String,
    },

    /// An internal invariant of the typed model was violated before XML
    /// could be produced. Always a programming error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The rendered XML failed XSD validation. Carries the full, ordered
    /// violation list — an expected, reportable outcome rather than a crash.
    #[error("schema validation failed with {} violation(s)", .0.len())]
    SchemaValidation(Vec<Violation>),

    /// XSD missing/corrupt, or I/O failure writing the output file.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// An extractor call exceeded the run's time budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The run was cancelled cooperatively at a stage boundary.
    #[error("run cancelled")]
    Cancelled,

    /// A source block the file format expects has no implementation in the
    /// host system. Distinct from a legitimately empty period.
    #[error("unsupported: {0} is not implemented by this source")]
    Unsupported(String),
}

impl SaftError {
    /// Exit code for the external job trigger: 0 = valid file produced,
    /// 1 = data/referential error, 2 = schema validation failure,
    /// 3 = fatal configuration/infrastructure error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DataIntegrity { .. }
            | Self::ReferentialIntegrity { .. }
            | Self::Serialization(_)
            | Self::Unsupported(_) => 1,
            Self::SchemaValidation(_) => 2,
            Self::Configuration(_)
            | Self::Infrastructure(_)
            | Self::Timeout(_)
            | Self::Cancelled => 3,
        }
    }
}

/// A single schema violation with document location and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Slash-separated path to the offending element (e.g. "AuditFile/Header/StartDate").
    pub path: String,
    /// Human-readable description of the broken rule.
    pub message: String,
    /// 1-based line in the candidate document, where available.
    pub line: Option<u64>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: {}: {}", line, self.path, self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(path: impl Into<String>, message: impl Into<String>, line: u64) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            line: Some(line),
        }
    }
}
