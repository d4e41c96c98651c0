//! XML serialization of the audit file.

mod render;
mod writer;

pub use render::{SAFT_NAMESPACE, SAFT_SCHEMA_LOCATION, to_saft_xml};
pub use writer::XmlWriter;
