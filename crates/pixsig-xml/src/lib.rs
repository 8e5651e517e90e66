#![forbid(unsafe_code)]

//! Safe XML loading and an owned document tree for pixsig.
//!
//! Input is screened by `roxmltree` with DTD processing disabled and parsed
//! by `uppsala`; the result is copied into a mutable arena tree so that
//! signature envelopes can be inserted and stale placeholders removed.
//! Serialization goes back out through uppsala's `XmlWriter`.

pub mod document;
pub mod escape;
pub mod loader;
pub mod nodeset;
pub mod writer;

pub use document::{Attribute, Document, Element, NodeId, NodeKind, ProcessingInstruction, QName};
pub use loader::{parse, parse_str, parse_str_with_options, parse_with_options, LoaderOptions};
pub use nodeset::NodeSet;
pub use writer::serialize;

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}
