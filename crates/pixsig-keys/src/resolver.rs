#![forbid(unsafe_code)]

//! Verification-time key resolution by issuer name and serial number.

use crate::dn::DistinguishedName;
use crate::keyinfo::{self, IssuerSerial};
use crate::truststore::TrustStore;
use crate::x509::{self, normalize_serial};
use pixsig_core::Error;
use pixsig_xml::{Document, NodeId};
use rsa::RsaPublicKey;
use std::sync::Arc;
use tracing::debug;

/// Resolve the public key of the trusted certificate with the given
/// issuer and serial, checking its validity window now.
pub fn resolve(
    issuer_name: &str,
    serial_number: &str,
    trust_store: &TrustStore,
) -> Result<RsaPublicKey, Error> {
    resolve_at(issuer_name, serial_number, trust_store, &x509::now()?)
}

/// Like [`resolve`] with an explicit validation instant.
///
/// Entries are examined in store order.  Both the serial and the issuer
/// must match; the first such entry is final, so an expired match yields
/// `ExpiredCertificate` even if a later entry would be valid.
pub fn resolve_at(
    issuer_name: &str,
    serial_number: &str,
    trust_store: &TrustStore,
    at: &der::DateTime,
) -> Result<RsaPublicKey, Error> {
    let not_found = || {
        Error::KeyNotFound(format!(
            "no trusted certificate with issuer '{issuer_name}' and serial {serial_number}"
        ))
    };
    let serial = normalize_serial(serial_number).ok_or_else(not_found)?;
    let issuer = DistinguishedName::parse(issuer_name).map_err(|_| not_found())?;

    let entry = trust_store
        .entries()
        .iter()
        .filter(|e| e.certificate.serial_decimal() == serial)
        .find(|e| {
            DistinguishedName::parse(e.certificate.issuer_name())
                .is_ok_and(|cert_issuer| cert_issuer == issuer)
        })
        .ok_or_else(not_found)?;

    entry.certificate.check_validity_at(at)?;
    debug!(alias = %entry.alias, serial = %serial, "resolved verification key");
    entry.certificate.public_key()
}

/// Selects the verification key named by a signature's `<KeyInfo>`.
#[derive(Debug, Clone)]
pub struct X509IssuerSerialKeySelector {
    trust_store: Arc<TrustStore>,
}

impl X509IssuerSerialKeySelector {
    pub fn new(trust_store: Arc<TrustStore>) -> Self {
        Self { trust_store }
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Resolve the key for an already-extracted issuer+serial pair.
    pub fn resolve(&self, issuer_serial: &IssuerSerial) -> Result<RsaPublicKey, Error> {
        resolve(
            &issuer_serial.issuer_name,
            &issuer_serial.serial_number,
            &self.trust_store,
        )
    }

    /// Read `X509IssuerSerial` from a `<KeyInfo>` element and resolve it.
    pub fn select(&self, doc: &Document, key_info: NodeId) -> Result<RsaPublicKey, Error> {
        let issuer_serial = keyinfo::read_issuer_serial(doc, key_info)?;
        self.resolve(&issuer_serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::X509Certificate;

    const SIGNER_PEM: &str = include_str!("../../../test-data/signer.pem");
    const ROTATED_PEM: &str = include_str!("../../../test-data/signer-rotated.pem");
    const COUNTERPARTY_PEM: &str = include_str!("../../../test-data/counterparty.pem");
    const EXPIRED_PEM: &str = include_str!("../../../test-data/expired.pem");
    const RENEWED_PEM: &str = include_str!("../../../test-data/renewed.pem");

    const SIGNER_ISSUER: &str = "CN=pix-signer,O=Pix Participant,C=BR";
    const LEGACY_ISSUER: &str = "CN=pix-legacy,O=Pix Participant,C=BR";

    fn cert(pem: &str) -> X509Certificate {
        X509Certificate::from_pem(pem).unwrap()
    }

    fn at() -> der::DateTime {
        der::DateTime::new(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_resolves_exact_match() {
        let store = TrustStore::from_certificates("t", [cert(COUNTERPARTY_PEM), cert(SIGNER_PEM)]);
        let key = resolve_at(SIGNER_ISSUER, "4097", &store, &at()).unwrap();
        assert_eq!(key, cert(SIGNER_PEM).public_key().unwrap());
    }

    #[test]
    fn test_serial_leading_zeros_and_issuer_formatting() {
        let store = TrustStore::from_certificates("t", [cert(SIGNER_PEM)]);
        assert!(resolve_at("cn=PIX-SIGNER, o=pix participant, c=br", "004097", &store, &at()).is_ok());
    }

    #[test]
    fn test_partial_matches_are_not_found() {
        // rotated: same issuer, serial 4098; counterparty: serial 4097, other issuer
        let store = TrustStore::from_certificates("t", [cert(ROTATED_PEM), cert(COUNTERPARTY_PEM)]);
        assert!(matches!(
            resolve_at(SIGNER_ISSUER, "4097", &store, &at()),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_expired_match_is_terminal() {
        let store = TrustStore::from_certificates("t", [cert(EXPIRED_PEM), cert(RENEWED_PEM)]);
        assert!(matches!(
            resolve_at(LEGACY_ISSUER, "8194", &store, &at()),
            Err(Error::ExpiredCertificate(_))
        ));

        let reordered = TrustStore::from_certificates("t", [cert(RENEWED_PEM), cert(EXPIRED_PEM)]);
        assert!(resolve_at(LEGACY_ISSUER, "8194", &reordered, &at()).is_ok());
    }

    #[test]
    fn test_invalid_serial_not_found() {
        let store = TrustStore::from_certificates("t", [cert(SIGNER_PEM)]);
        assert!(matches!(
            resolve_at(SIGNER_ISSUER, "0x1001", &store, &at()),
            Err(Error::KeyNotFound(_))
        ));
        assert!(matches!(
            resolve_at(SIGNER_ISSUER, "4097", &TrustStore::new(), &at()),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_selector_reads_key_info() {
        let store = Arc::new(TrustStore::from_certificates("t", [cert(SIGNER_PEM)]));
        let selector = X509IssuerSerialKeySelector::new(store);
        let xml = format!(
            r#"<KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><X509Data><X509IssuerSerial><X509IssuerName>{SIGNER_ISSUER}</X509IssuerName><X509SerialNumber>4097</X509SerialNumber></X509IssuerSerial></X509Data></KeyInfo>"#
        );
        let doc = pixsig_xml::parse_str(&xml).unwrap();
        let ki = doc.document_element().unwrap();
        assert!(selector.select(&doc, ki).is_ok());
    }
}
