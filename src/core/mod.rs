//! Typed SAF-T (AO) schema model, error taxonomy, and fixed-format rendering.
//!
//! The model replaces dynamic document assembly with tagged types for each
//! block and closed enums for fixed-choice fields, so element order and
//! required fields are enforced by the type system rather than by ordering
//! lists maintained by hand.

mod error;
pub mod format;
mod period;
mod types;

pub use error::*;
pub use period::*;
pub use types::*;
