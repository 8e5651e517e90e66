#![forbid(unsafe_code)]

//! URI resolution for XML-DSig references.
//!
//! Only same-document references are resolved; nothing is ever fetched.
//! A reference without a `URI` attribute is passed as `None`, which is
//! distinct from the empty URI `Some("")`.

use pixsig_core::{ns, Error};
use pixsig_xml::{parse_same_document_ref, Document, NodeId, NodeSet};
use tracing::debug;

/// Resolves a reference URI to the node set it selects.
pub trait UriDereferencer: Send + Sync {
    fn dereference(&self, uri: Option<&str>, doc: &Document) -> Result<NodeSet, Error>;
}

/// Same-document dereferencing per XML-DSig.
///
/// - `""` selects the whole document without comments.
/// - `#id` and `#xpointer(id('id'))` select the subtree of the element
///   whose `Id`, `ID` or `id` attribute equals `id`, without comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDereferencer;

impl UriDereferencer for DefaultDereferencer {
    fn dereference(&self, uri: Option<&str>, doc: &Document) -> Result<NodeSet, Error> {
        let uri = uri.ok_or_else(|| Error::InvalidUri("reference has no URI".into()))?;
        if uri.is_empty() {
            return Ok(NodeSet::all_without_comments(doc));
        }
        let fragment = parse_same_document_ref(uri)
            .ok_or_else(|| Error::InvalidUri(format!("external URI not supported: {uri}")))?;
        let id = parse_xpointer_id(fragment).unwrap_or(fragment);
        let node = doc
            .find_by_id(id)
            .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))?;
        Ok(NodeSet::tree_without_comments(node, doc))
    }
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr
        .strip_prefix("xpointer(id('")
        .and_then(|s| s.strip_suffix("'))"))
        .or_else(|| {
            expr.strip_prefix("xpointer(id(\"")
                .and_then(|s| s.strip_suffix("\"))"))
        })?;
    Some(inner)
}

/// Dereferencing for ISO 20022 business messages.
///
/// - no URI selects the unique `Document` element (the business payload);
/// - `""` selects the unique `AppHdr` element rather than the whole
///   document;
/// - anything else is delegated to the default dereferencer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso20022Dereferencer {
    fallback: DefaultDereferencer,
}

impl Iso20022Dereferencer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UriDereferencer for Iso20022Dereferencer {
    fn dereference(&self, uri: Option<&str>, doc: &Document) -> Result<NodeSet, Error> {
        let local_name = match uri {
            None => ns::iso20022::DOCUMENT,
            Some("") => ns::iso20022::APP_HDR,
            Some(_) => return self.fallback.dereference(uri, doc),
        };
        let node = find_unique_element(doc, local_name)?;
        debug!(uri = ?uri, element = local_name, "dereferenced ISO 20022 reference");
        Ok(NodeSet::tree_without_comments(node, doc))
    }
}

/// The only element with the given local name, in any namespace.
pub fn find_unique_element(doc: &Document, local_name: &str) -> Result<NodeId, Error> {
    let found = doc.find_elements_by_local_name(local_name);
    match found.as_slice() {
        [one] => Ok(*one),
        [] => Err(Error::AmbiguousElement(format!("no <{local_name}> element detected"))),
        many => Err(Error::AmbiguousElement(format!(
            "{} <{local_name}> elements detected",
            many.len()
        ))),
    }
}
