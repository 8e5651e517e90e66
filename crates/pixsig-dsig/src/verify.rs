#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Find the first `<Signature>` and read `<SignedInfo>`
//! 2. Resolve the verification key from `<KeyInfo>`
//! 3. Canonicalize `<SignedInfo>` and check `<SignatureValue>`
//! 4. Dereference, transform and digest each `<Reference>`

use crate::profile::SignatureProfile;
use crate::reference::{self, is_dsig};
use base64::Engine;
use pixsig_c14n::C14nMode;
use pixsig_core::{ns, Error};
use pixsig_crypto::sign;
use pixsig_keys::X509IssuerSerialKeySelector;
use pixsig_xml::{Document, NodeId};
use tracing::debug;

/// Validity of one `<Reference>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceStatus {
    pub uri: Option<String>,
    pub valid: bool,
}

/// Result of core validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub signature_value_valid: bool,
    /// In `<SignedInfo>` order.
    pub references: Vec<ReferenceStatus>,
}

/// Validate the first XML-DSig signature in `doc`.
///
/// Returns `Ok(None)` when the document carries no signature.
pub fn verify_document(
    doc: &Document,
    selector: &X509IssuerSerialKeySelector,
    profile: &dyn SignatureProfile,
) -> Result<Option<VerificationOutcome>, Error> {
    let Some(signature) = doc.find_element(ns::DSIG, ns::node::SIGNATURE) else {
        return Ok(None);
    };
    let signed_info = doc
        .find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNED_INFO.into()))?;

    // SignedInfo methods
    let c14n_node = doc
        .find_child_element(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement(ns::node::CANONICALIZATION_METHOD.into()))?;
    let c14n_uri =
        reference::required_algorithm(doc, c14n_node, ns::node::CANONICALIZATION_METHOD)?;
    let c14n_mode = C14nMode::from_uri(&c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
    let inclusive_prefixes = reference::read_inclusive_prefixes(doc, c14n_node);

    let method_node = doc
        .find_child_element(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE_METHOD.into()))?;
    let method_uri = reference::required_algorithm(doc, method_node, ns::node::SIGNATURE_METHOD)?;
    let method = sign::from_uri(&method_uri)?;

    // Key
    let key_info = doc
        .child_elements(signature)
        .find(|c| is_dsig(doc, *c, ns::node::KEY_INFO))
        .ok_or_else(|| Error::MissingElement(ns::node::KEY_INFO.into()))?;
    let public_key = selector.select(doc, key_info)?;

    // SignatureValue
    let signature_value = decode_base64(doc, signature, ns::node::SIGNATURE_VALUE)?;
    let c14n_signed_info =
        reference::canonicalize_signed_info(doc, signed_info, c14n_mode, &inclusive_prefixes)?;
    let signature_value_valid = method.verify(&public_key, &c14n_signed_info, &signature_value)?;

    // References
    let parsed = reference::read_references(doc, signed_info)?;
    if parsed.is_empty() {
        return Err(Error::MissingElement(ns::node::REFERENCE.into()));
    }
    let engine = base64::engine::general_purpose::STANDARD;
    let mut references = Vec::with_capacity(parsed.len());
    for r in parsed {
        let expected = engine
            .decode(strip_whitespace(&r.digest_value))
            .map_err(|e| Error::Base64(format!("DigestValue: {e}")))?;
        let computed =
            reference::compute_digest(doc, signature, &r.spec, profile.dereferencer())?;
        let valid = computed == expected;
        debug!(uri = ?r.spec.uri, valid, "checked reference digest");
        references.push(ReferenceStatus {
            uri: r.spec.uri,
            valid,
        });
    }

    let valid = signature_value_valid && references.iter().all(|r| r.valid);
    Ok(Some(VerificationOutcome {
        valid,
        signature_value_valid,
        references,
    }))
}

fn decode_base64(doc: &Document, parent: NodeId, local: &str) -> Result<Vec<u8>, Error> {
    let node = doc
        .find_child_element(parent, ns::DSIG, local)
        .ok_or_else(|| Error::MissingElement(local.into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(strip_whitespace(&doc.text_content(node)))
        .map_err(|e| Error::Base64(format!("{local}: {e}")))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
