#![forbid(unsafe_code)]

//! Signature profiles.
//!
//! A profile decides which references a signature carries, where the
//! `<Signature>` element is placed, and how reference URIs resolve.

use pixsig_core::{algorithm, ns, Error};
use pixsig_transforms::{
    DefaultDereferencer, Iso20022Dereferencer, TransformSpec, UriDereferencer,
};
use pixsig_xml::{Document, NodeId, QName};
use tracing::debug;

/// A `<Reference>` to be produced when signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpec {
    /// `None` omits the `URI` attribute entirely.
    pub uri: Option<String>,
    pub transforms: Vec<TransformSpec>,
    pub digest_method: String,
}

impl ReferenceSpec {
    pub fn new(uri: Option<&str>, transforms: Vec<TransformSpec>) -> Self {
        Self {
            uri: uri.map(str::to_owned),
            transforms,
            digest_method: algorithm::POLICY_DIGEST.to_owned(),
        }
    }

    /// Reference to the `<KeyInfo>` element with the given Id.
    pub fn key_info(key_info_id: &str) -> Self {
        Self::new(
            Some(&format!("#{key_info_id}")),
            vec![TransformSpec::exc_c14n()],
        )
    }

    /// Enveloped reference with the empty URI.
    pub fn enveloped() -> Self {
        Self::new(
            Some(""),
            vec![TransformSpec::enveloped_signature(), TransformSpec::exc_c14n()],
        )
    }
}

/// Profile-specific parts of signing and verification.
pub trait SignatureProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// References in the order they appear in `<SignedInfo>`.
    fn references(&self, key_info_id: &str) -> Vec<ReferenceSpec>;

    /// Prepare the document and return the element that will hold
    /// `<Signature>` as its last child.
    fn locate_envelope(&self, doc: &mut Document) -> Result<NodeId, Error>;

    fn dereferencer(&self) -> &dyn UriDereferencer;
}

// ── Generic ──────────────────────────────────────────────────────────

/// Enveloped signature over the whole document.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericProfile {
    dereferencer: DefaultDereferencer,
}

impl GenericProfile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureProfile for GenericProfile {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn references(&self, key_info_id: &str) -> Vec<ReferenceSpec> {
        vec![ReferenceSpec::key_info(key_info_id), ReferenceSpec::enveloped()]
    }

    fn locate_envelope(&self, doc: &mut Document) -> Result<NodeId, Error> {
        doc.document_element()
            .ok_or_else(|| Error::MissingElement("document element".into()))
    }

    fn dereferencer(&self) -> &dyn UriDereferencer {
        &self.dereferencer
    }
}

// ── ISO 20022 ────────────────────────────────────────────────────────

/// Business message profile: the signature lives in `AppHdr/Sgntr` and
/// covers the header and the `Document` body separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso20022Profile {
    dereferencer: Iso20022Dereferencer,
}

impl Iso20022Profile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureProfile for Iso20022Profile {
    fn name(&self) -> &'static str {
        "iso20022"
    }

    fn references(&self, key_info_id: &str) -> Vec<ReferenceSpec> {
        vec![
            ReferenceSpec::key_info(key_info_id),
            ReferenceSpec::enveloped(),
            ReferenceSpec::new(None, vec![TransformSpec::exc_c14n()]),
        ]
    }

    fn locate_envelope(&self, doc: &mut Document) -> Result<NodeId, Error> {
        let headers = doc.find_elements_by_local_name(ns::iso20022::APP_HDR);
        let header = match headers.as_slice() {
            [one] => *one,
            [] => return Err(Error::MissingElement(ns::iso20022::APP_HDR.into())),
            many => {
                return Err(Error::AmbiguousElement(format!(
                    "{} <{}> elements detected",
                    many.len(),
                    ns::iso20022::APP_HDR
                )))
            }
        };

        let stale: Vec<NodeId> = doc
            .child_elements(header)
            .filter(|c| {
                doc.element(*c)
                    .is_some_and(|e| e.local_name() == ns::iso20022::SGNTR)
            })
            .collect();
        if !stale.is_empty() {
            debug!(count = stale.len(), "removing existing signature placeholders");
        }
        for node in stale {
            doc.remove(node)?;
        }

        let name = match doc.element(header) {
            Some(e) => QName {
                prefix: e.name.prefix.clone(),
                local_name: ns::iso20022::SGNTR.to_owned(),
                namespace_uri: e.name.namespace_uri.clone(),
            },
            None => return Err(Error::MissingElement(ns::iso20022::APP_HDR.into())),
        };
        doc.append_element(header, name)
    }

    fn dereferencer(&self) -> &dyn UriDereferencer {
        &self.dereferencer
    }
}
