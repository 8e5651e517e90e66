#![forbid(unsafe_code)]

//! Ordered store of trusted certificates.
//!
//! Entries keep insertion order; key resolution walks them front to back
//! and stops at the first issuer+serial match.

use crate::loader;
use crate::x509::X509Certificate;
use pixsig_core::Error;

/// A trusted certificate and the alias it was registered under.
#[derive(Debug, Clone)]
pub struct TrustEntry {
    pub alias: String,
    pub certificate: X509Certificate,
}

/// Trusted certificates used for verification-time key resolution.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    entries: Vec<TrustEntry>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store with aliases `<alias_prefix>-0`, `<alias_prefix>-1`, ...
    pub fn from_certificates(
        alias_prefix: &str,
        certificates: impl IntoIterator<Item = X509Certificate>,
    ) -> Self {
        let mut store = Self::new();
        store.extend_with_prefix(alias_prefix, certificates);
        store
    }

    /// Build a store from one or more concatenated PEM certificates.
    pub fn from_pem_bundle(alias_prefix: &str, pem: &[u8]) -> Result<Self, Error> {
        let certs = loader::load_certificates(pem)?;
        Ok(Self::from_certificates(alias_prefix, certs))
    }

    /// Append certificates, numbering aliases after the entries already
    /// carrying `alias_prefix`.
    pub fn extend_with_prefix(
        &mut self,
        alias_prefix: &str,
        certificates: impl IntoIterator<Item = X509Certificate>,
    ) {
        let start = self
            .entries
            .iter()
            .filter(|e| {
                e.alias
                    .strip_prefix(alias_prefix)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .is_some_and(|n| n.parse::<usize>().is_ok())
            })
            .count();
        for (i, certificate) in certificates.into_iter().enumerate() {
            self.entries.push(TrustEntry {
                alias: format!("{alias_prefix}-{}", start + i),
                certificate,
            });
        }
    }

    pub fn get(&self, alias: &str) -> Option<&X509Certificate> {
        self.entries
            .iter()
            .find(|e| e.alias == alias)
            .map(|e| &e.certificate)
    }

    pub fn entries(&self) -> &[TrustEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_PEM: &str = include_str!("../../../test-data/signer.pem");
    const COUNTERPARTY_PEM: &str = include_str!("../../../test-data/counterparty.pem");

    #[test]
    fn test_bundle_aliases_in_order() {
        let bundle = format!("{SIGNER_PEM}\n{COUNTERPARTY_PEM}");
        let store = TrustStore::from_pem_bundle("spi", bundle.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].alias, "spi-0");
        assert_eq!(store.entries()[1].alias, "spi-1");
        assert!(store.get("spi-1").unwrap().subject_name().contains("spi-signer"));
    }

    #[test]
    fn test_extend_continues_numbering() {
        let signer = X509Certificate::from_pem(SIGNER_PEM).unwrap();
        let other = X509Certificate::from_pem(COUNTERPARTY_PEM).unwrap();
        let mut store = TrustStore::from_certificates("bcb", [signer.clone()]);
        store.extend_with_prefix("bcb", [other]);
        store.extend_with_prefix("local", [signer]);
        let aliases: Vec<_> = store.entries().iter().map(|e| e.alias.as_str()).collect();
        assert_eq!(aliases, vec!["bcb-0", "bcb-1", "local-0"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_empty_bundle_rejected() {
        assert!(TrustStore::from_pem_bundle("x", b"").is_err());
    }
}
