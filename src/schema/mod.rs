//! XSD validation of the rendered audit file.
//!
//! The official SAF-T (AO) schema ships inside the binary; a validator
//! built from it is cached for the life of the process. Validation is the
//! last pipeline stage and the gate on every produced file: well-formedness
//! failures are serializer faults, rule failures come back as the complete
//! list of violations.

mod engine;
mod xsd;

use std::path::Path;
use std::sync::OnceLock;

use crate::core::{SaftError, Violation};

/// The SAF-T (AO) 1.04_01 schema bundled into the binary.
pub const BUNDLED_XSD: &str = include_str!("../../schema/SAFTAO1.04_01.xsd");

/// A compiled schema, reusable across runs and threads.
pub struct SchemaValidator {
    schema: xsd::Schema,
}

impl SchemaValidator {
    /// Compile a validator from schema text.
    pub fn from_str(text: &str) -> Result<Self, SaftError> {
        let schema = xsd::parse_schema(text)
            .map_err(|e| SaftError::Infrastructure(format!("cannot load schema: {e}")))?;
        Ok(Self { schema })
    }

    /// Compile a validator from a schema file on disk.
    pub fn from_path(path: &Path) -> Result<Self, SaftError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SaftError::Infrastructure(format!("cannot read schema {}: {e}", path.display()))
        })?;
        Self::from_str(&text)
    }

    /// The process-wide validator for the bundled schema, compiled on first
    /// use. A corrupt bundled schema reports the same infrastructure error
    /// on every call rather than failing once and succeeding later.
    pub fn bundled() -> Result<&'static SchemaValidator, SaftError> {
        static CACHE: OnceLock<Result<SchemaValidator, String>> = OnceLock::new();
        match CACHE.get_or_init(|| {
            SchemaValidator::from_str(BUNDLED_XSD).map_err(|e| e.to_string())
        }) {
            Ok(validator) => Ok(validator),
            Err(message) => Err(SaftError::Infrastructure(message.clone())),
        }
    }

    /// Target namespace the compiled schema validates against.
    pub fn target_namespace(&self) -> &str {
        &self.schema.target_namespace
    }

    /// Validate a candidate document.
    ///
    /// Input that is not well-formed XML fails with
    /// [`SaftError::Serialization`] — the serializer guarantees
    /// well-formedness, so that class is a programming error. Documents that
    /// are well-formed but break schema rules fail with
    /// [`SaftError::SchemaValidation`] carrying every violation found.
    pub fn validate(&self, xml: &str) -> Result<(), SaftError> {
        let violations = self.check(xml)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SaftError::SchemaValidation(violations))
        }
    }

    /// Like [`validate`](Self::validate) but returns the violation list
    /// directly, for callers that report rather than fail.
    pub fn check(&self, xml: &str) -> Result<Vec<Violation>, SaftError> {
        let doc = engine::load_tree(xml).map_err(|e| {
            SaftError::Serialization(format!(
                "XML is not well-formed: {} (line {})",
                e.message, e.line
            ))
        })?;
        Ok(engine::validate_tree(&self.schema, &doc))
    }
}
