#![forbid(unsafe_code)]

//! X.509 certificate details used for issuer+serial key resolution.
//!
//! Only what the signature engine needs is exposed: issuer and subject
//! names, the serial number as canonical decimal, the validity window and
//! the RSA public key.  Chain building and revocation are out of scope.

use der::{Decode, DecodePem, Encode};
use pixsig_core::Error;
use rsa::RsaPublicKey;
use spki::DecodePublicKey;
use x509_cert::Certificate;

/// A parsed X.509 certificate with its derived lookup fields.
#[derive(Debug, Clone)]
pub struct X509Certificate {
    cert: Certificate,
    der: Vec<u8>,
    issuer: String,
    subject: String,
    serial: String,
}

impl X509Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        Self::from_certificate(cert)
    }

    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let cert = Certificate::from_pem(pem.trim())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        Self::from_certificate(cert)
    }

    pub fn from_certificate(cert: Certificate) -> Result<Self, Error> {
        let der = cert
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode certificate: {e}")))?;
        let tbs = &cert.tbs_certificate;
        let issuer = tbs.issuer.to_string();
        let subject = tbs.subject.to_string();
        let serial = format_serial_decimal(tbs.serial_number.as_bytes());
        Ok(Self {
            cert,
            der,
            issuer,
            subject,
            serial,
        })
    }

    /// Issuer name in RFC 4514 form.
    pub fn issuer_name(&self) -> &str {
        &self.issuer
    }

    /// Subject name in RFC 4514 form.
    pub fn subject_name(&self) -> &str {
        &self.subject
    }

    /// Serial number as an unsigned decimal string without leading zeros.
    pub fn serial_decimal(&self) -> &str {
        &self.serial
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn not_before(&self) -> der::DateTime {
        self.cert.tbs_certificate.validity.not_before.to_date_time()
    }

    pub fn not_after(&self) -> der::DateTime {
        self.cert.tbs_certificate.validity.not_after.to_date_time()
    }

    /// Check the validity window at `at`.
    pub fn check_validity_at(&self, at: &der::DateTime) -> Result<(), Error> {
        let not_before = self.not_before();
        let not_after = self.not_after();
        if *at < not_before {
            return Err(Error::ExpiredCertificate(format!(
                "certificate {} serial {} is not yet valid (notBefore: {not_before})",
                self.subject, self.serial
            )));
        }
        if *at > not_after {
            return Err(Error::ExpiredCertificate(format!(
                "certificate {} serial {} has expired (notAfter: {not_after})",
                self.subject, self.serial
            )));
        }
        Ok(())
    }

    /// The certificate's RSA public key.
    pub fn public_key(&self) -> Result<RsaPublicKey, Error> {
        let spki_der = self
            .cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;
        RsaPublicKey::from_public_key_der(&spki_der)
            .map_err(|e| Error::Key(format!("certificate does not carry an RSA key: {e}")))
    }
}

/// Get the current time as a `der::DateTime`.
pub fn now() -> Result<der::DateTime, Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::Certificate(format!("system time error: {e}")))?;
    der::DateTime::from_unix_duration(now)
        .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))
}

/// Convert a big-endian ASN.1 INTEGER to an unsigned decimal string.
///
/// A leading 0x00 sign byte is ignored.
pub fn format_serial_decimal(bytes: &[u8]) -> String {
    // little-endian decimal digits
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for d in digits.iter_mut() {
            let val = (*d as u32) * 256 + carry;
            *d = (val % 10) as u8;
            carry = val / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| (b'0' + d) as char).collect()
}

/// Canonicalize a decimal serial number taken from XML.
///
/// Returns `None` if the text is not a non-negative decimal integer.
pub fn normalize_serial(text: &str) -> Option<String> {
    let t = text.trim();
    let t = t.strip_prefix('+').unwrap_or(t);
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = t.trim_start_matches('0');
    Some(if stripped.is_empty() { "0".to_owned() } else { stripped.to_owned() })
}
