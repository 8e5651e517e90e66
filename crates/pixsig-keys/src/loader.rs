#![forbid(unsafe_code)]

//! Key and certificate loading from PEM and DER.

use crate::x509::X509Certificate;
use der::Decode;
use pixsig_core::Error;
use rsa::RsaPrivateKey;
use std::path::Path;
use x509_cert::Certificate;

/// Load an RSA private key from PEM data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<RsaPrivateKey, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Try PKCS#8 first
    if let Ok(pk) = RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(pk);
    }

    RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))
}

/// Load an RSA private key from DER data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_der(der: &[u8]) -> Result<RsaPrivateKey, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(pk);
    }
    RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key DER: {e}")))
}

/// Load an RSA private key, detecting PEM or DER.
pub fn load_rsa_private_key(data: &[u8]) -> Result<RsaPrivateKey, Error> {
    if is_pem(data) {
        load_rsa_private_pem(data)
    } else {
        load_rsa_private_der(data)
    }
}

/// Load a single certificate, detecting PEM or DER.
pub fn load_certificate(data: &[u8]) -> Result<X509Certificate, Error> {
    if is_pem(data) {
        let pem = std::str::from_utf8(data)
            .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;
        X509Certificate::from_pem(pem)
    } else {
        X509Certificate::from_der(data)
    }
}

/// Load every certificate in a PEM bundle, or a single DER certificate.
pub fn load_certificates(data: &[u8]) -> Result<Vec<X509Certificate>, Error> {
    if !is_pem(data) {
        if data.is_empty() {
            return Err(Error::Certificate("no certificates found".into()));
        }
        let cert = Certificate::from_der(data)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        return Ok(vec![X509Certificate::from_certificate(cert)?]);
    }

    let certs = Certificate::load_pem_chain(trim_ascii(data))
        .map_err(|e| Error::Certificate(format!("failed to decode certificate bundle: {e}")))?;
    if certs.is_empty() {
        return Err(Error::Certificate("no certificates found".into()));
    }
    certs
        .into_iter()
        .map(X509Certificate::from_certificate)
        .collect()
}

pub fn load_key_file(path: &Path) -> Result<RsaPrivateKey, Error> {
    load_rsa_private_key(&std::fs::read(path)?)
}

pub fn load_certificate_file(path: &Path) -> Result<X509Certificate, Error> {
    load_certificate(&std::fs::read(path)?)
}

pub fn load_certificates_file(path: &Path) -> Result<Vec<X509Certificate>, Error> {
    load_certificates(&std::fs::read(path)?)
}

fn is_pem(data: &[u8]) -> bool {
    trim_ascii(data).starts_with(b"-----BEGIN")
}

fn trim_ascii(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &data[start..end]
}
