#![forbid(unsafe_code)]

//! `<Reference>` processing shared by signing and verification.

use crate::profile::ReferenceSpec;
use pixsig_core::{ns, Error};
use pixsig_crypto::digest;
use pixsig_transforms::{TransformData, TransformPipeline, TransformSpec, UriDereferencer};
use pixsig_xml::{Document, NodeId, NodeSet};
use tracing::debug;

/// Dereference, transform and digest one reference.
pub fn compute_digest(
    doc: &Document,
    signature: NodeId,
    reference: &ReferenceSpec,
    dereferencer: &dyn UriDereferencer,
) -> Result<Vec<u8>, Error> {
    let node_set = dereferencer.dereference(reference.uri.as_deref(), doc)?;
    let selected = node_set.len();
    let pipeline = TransformPipeline::from_specs(&reference.transforms, signature)?;
    let bytes = pipeline
        .execute(TransformData::Xml { doc, node_set })?
        .into_binary()?;
    let value = digest::digest(&reference.digest_method, &bytes)?;
    debug!(
        uri = ?reference.uri,
        nodes = selected,
        transforms = reference.transforms.len(),
        octets = bytes.len(),
        "computed reference digest"
    );
    Ok(value)
}

/// Canonical form of `<SignedInfo>`.
pub fn canonicalize_signed_info(
    doc: &Document,
    signed_info: NodeId,
    mode: pixsig_c14n::C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let node_set = NodeSet::tree_without_comments(signed_info, doc);
    pixsig_c14n::canonicalize(doc, mode, Some(&node_set), inclusive_prefixes)
}

/// A `<Reference>` read back from a signed document.
#[derive(Debug, Clone)]
pub struct ParsedReference {
    pub spec: ReferenceSpec,
    pub digest_value: String,
}

/// Read every `<Reference>` child of `<SignedInfo>`.
pub fn read_references(doc: &Document, signed_info: NodeId) -> Result<Vec<ParsedReference>, Error> {
    doc.child_elements(signed_info)
        .filter(|c| is_dsig(doc, *c, ns::node::REFERENCE))
        .map(|r| read_reference(doc, r))
        .collect()
}

fn read_reference(doc: &Document, reference: NodeId) -> Result<ParsedReference, Error> {
    let uri = doc
        .element(reference)
        .and_then(|e| e.attribute(ns::attr::URI))
        .map(str::to_owned);

    let mut transforms = Vec::new();
    if let Some(list) = doc.find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) {
        for t in doc
            .child_elements(list)
            .filter(|c| is_dsig(doc, *c, ns::node::TRANSFORM))
        {
            let algorithm = required_algorithm(doc, t, ns::node::TRANSFORM)?;
            transforms.push(TransformSpec {
                algorithm,
                inclusive_prefixes: read_inclusive_prefixes(doc, t),
            });
        }
    }

    let digest_method = doc
        .find_child_element(reference, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement(ns::node::DIGEST_METHOD.into()))?;
    let digest_method = required_algorithm(doc, digest_method, ns::node::DIGEST_METHOD)?;
    let digest_value = doc
        .find_child_element(reference, ns::DSIG, ns::node::DIGEST_VALUE)
        .map(|n| doc.text_content(n))
        .ok_or_else(|| Error::MissingElement(ns::node::DIGEST_VALUE.into()))?;

    Ok(ParsedReference {
        spec: ReferenceSpec {
            uri,
            transforms,
            digest_method,
        },
        digest_value,
    })
}

/// The `Algorithm` attribute of a method element.
pub fn required_algorithm(doc: &Document, node: NodeId, what: &str) -> Result<String, Error> {
    doc.element(node)
        .and_then(|e| e.attribute(ns::attr::ALGORITHM))
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {what}")))
}

/// `InclusiveNamespaces/@PrefixList` under a transform or c14n method.
pub fn read_inclusive_prefixes(doc: &Document, node: NodeId) -> Vec<String> {
    doc.find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| doc.element(n))
        .and_then(|e| e.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

pub(crate) fn is_dsig(doc: &Document, id: NodeId, local: &str) -> bool {
    doc.element(id)
        .is_some_and(|e| e.namespace() == ns::DSIG && e.local_name() == local)
}
