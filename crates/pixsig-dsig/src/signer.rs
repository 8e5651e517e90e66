#![forbid(unsafe_code)]

//! The [`XmlSigner`] entry point.

use crate::profile::{GenericProfile, Iso20022Profile, SignatureProfile};
use crate::sign::sign_document;
use crate::verify::{verify_document, VerificationOutcome};
use pixsig_core::{ns, Error};
use pixsig_keys::{SigningIdentity, TrustStore, X509IssuerSerialKeySelector};
use pixsig_xml::{serialize, Document};
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

/// Signs and verifies XML messages under one profile.
///
/// Holds only immutable configuration; share it behind an `Arc` and call
/// it from any thread.
#[derive(Clone)]
pub struct XmlSigner {
    identity: SigningIdentity,
    selector: X509IssuerSerialKeySelector,
    profile: Arc<dyn SignatureProfile>,
}

impl XmlSigner {
    pub fn new(
        identity: SigningIdentity,
        trust_store: Arc<TrustStore>,
        profile: Arc<dyn SignatureProfile>,
    ) -> Self {
        Self {
            identity,
            selector: X509IssuerSerialKeySelector::new(trust_store),
            profile,
        }
    }

    pub fn generic(identity: SigningIdentity, trust_store: Arc<TrustStore>) -> Self {
        Self::new(identity, trust_store, Arc::new(GenericProfile::new()))
    }

    pub fn iso20022(identity: SigningIdentity, trust_store: Arc<TrustStore>) -> Self {
        Self::new(identity, trust_store, Arc::new(Iso20022Profile::new()))
    }

    pub fn profile(&self) -> &dyn SignatureProfile {
        self.profile.as_ref()
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    pub fn trust_store(&self) -> &TrustStore {
        self.selector.trust_store()
    }

    /// Sign a message, returning it with one `<ds:Signature>` added.
    ///
    /// Empty input is returned unchanged. Every failure is reported as
    /// [`Error::Signing`].
    pub fn sign(&self, xml: &str) -> Result<String, Error> {
        if xml.is_empty() {
            return Ok(String::new());
        }
        pixsig_xml::parse_str(xml)
            .and_then(|doc| self.sign_parsed(doc))
            .map_err(Error::signing)
    }

    /// Byte-slice form of [`sign`](Self::sign).
    pub fn sign_bytes(&self, xml: &[u8]) -> Result<Vec<u8>, Error> {
        if xml.is_empty() {
            return Ok(Vec::new());
        }
        pixsig_xml::parse(xml)
            .and_then(|doc| self.sign_parsed(doc))
            .map(String::into_bytes)
            .map_err(Error::signing)
    }

    fn sign_parsed(&self, mut doc: Document) -> Result<String, Error> {
        sign_document(&mut doc, &self.identity, self.profile.as_ref())?;
        Ok(serialize(&doc))
    }

    /// Verify the first signature in a message.
    ///
    /// Never fails; problems are logged and reported as `false`.
    pub fn verify(&self, xml: &str) -> bool {
        if xml.is_empty() {
            warn!("empty document, nothing to verify");
            return false;
        }
        self.report(pixsig_xml::parse_str(xml))
    }

    /// Byte-slice form of [`verify`](Self::verify).
    pub fn verify_bytes(&self, xml: &[u8]) -> bool {
        if xml.is_empty() {
            warn!("empty document, nothing to verify");
            return false;
        }
        self.report(pixsig_xml::parse(xml))
    }

    /// Run core validation and return the detailed outcome.
    pub fn validate(&self, xml: &str) -> Result<VerificationOutcome, Error> {
        let doc = pixsig_xml::parse_str(xml)?;
        verify_document(&doc, &self.selector, self.profile.as_ref())?
            .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE.into()))
    }

    fn report(&self, doc: Result<Document, Error>) -> bool {
        let outcome = doc.and_then(|doc| {
            verify_document(&doc, &self.selector, self.profile.as_ref())
        });
        match outcome {
            Ok(Some(outcome)) if outcome.valid => true,
            Ok(Some(outcome)) => {
                error!(profile = self.profile.name(), "signature failed core validation");
                error!(
                    valid = outcome.signature_value_valid,
                    "signature validation status"
                );
                for (i, r) in outcome.references.iter().enumerate() {
                    error!(index = i, uri = ?r.uri, valid = r.valid, "reference validity status");
                }
                false
            }
            Ok(None) => {
                error!("no signature found");
                false
            }
            Err(e) => {
                error!(error = %e, "failed to verify signature");
                false
            }
        }
    }
}

impl fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlSigner")
            .field("profile", &self.profile.name())
            .field("identity", &self.identity)
            .field("trusted", &self.selector.trust_store().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = include_str!("../../../test-data/signer.key");
    const CERT: &str = include_str!("../../../test-data/signer.pem");

    fn signer() -> XmlSigner {
        let identity = SigningIdentity::from_key_and_cert(KEY.as_bytes(), CERT.as_bytes()).unwrap();
        let store = TrustStore::from_pem_bundle("trusted", CERT.as_bytes()).unwrap();
        XmlSigner::generic(identity, Arc::new(store))
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_signer_is_send_sync() {
        assert_send_sync::<XmlSigner>();
    }

    #[test]
    fn test_empty_input() {
        let s = signer();
        assert_eq!(s.sign("").unwrap(), "");
        assert!(s.sign_bytes(b"").unwrap().is_empty());
        assert!(!s.verify(""));
        assert!(!s.verify_bytes(b""));
    }

    #[test]
    fn test_malformed_input_is_signing_error() {
        match signer().sign("<a><b></a>") {
            Err(Error::Signing(inner)) => assert!(matches!(*inner, Error::MalformedInput(_))),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sign_bytes_then_verify_bytes() {
        let s = signer();
        let signed = s.sign_bytes(b"<Msg><Id>E1</Id></Msg>").unwrap();
        assert!(s.verify_bytes(&signed));
    }

    #[test]
    fn test_validate_without_signature() {
        assert!(matches!(
            signer().validate("<Msg/>"),
            Err(Error::MissingElement(_))
        ));
    }
}
