#![forbid(unsafe_code)]

//! The signer's key handle paired with its certificate.

use crate::keyinfo::IssuerSerial;
use crate::loader;
use crate::x509::X509Certificate;
use pixsig_core::Error;
use pixsig_crypto::{RsaKeyHandle, SigningKeyHandle};
use rsa::RsaPrivateKey;
use std::fmt;
use std::sync::Arc;

/// A private key handle and the certificate that names it.
#[derive(Clone)]
pub struct SigningIdentity {
    handle: Arc<dyn SigningKeyHandle>,
    certificate: X509Certificate,
}

impl SigningIdentity {
    /// Pair an opaque key handle with its certificate.  The pairing is
    /// trusted as given; remote handles cannot be checked locally.
    pub fn new(handle: Arc<dyn SigningKeyHandle>, certificate: X509Certificate) -> Self {
        Self {
            handle,
            certificate,
        }
    }

    /// Wrap an in-memory RSA key, checking it matches the certificate.
    pub fn from_rsa_key(key: RsaPrivateKey, certificate: X509Certificate) -> Result<Self, Error> {
        if key.to_public_key() != certificate.public_key()? {
            return Err(Error::Key(format!(
                "private key does not match certificate {}",
                certificate.subject_name()
            )));
        }
        let handle = RsaKeyHandle::new(certificate.subject_name(), key);
        Ok(Self::new(Arc::new(handle), certificate))
    }

    /// Load from a private key (PEM or DER) and a certificate (PEM or DER).
    pub fn from_key_and_cert(key: &[u8], cert: &[u8]) -> Result<Self, Error> {
        let key = loader::load_rsa_private_key(key)?;
        let certificate = loader::load_certificate(cert)?;
        Self::from_rsa_key(key, certificate)
    }

    pub fn handle(&self) -> &dyn SigningKeyHandle {
        self.handle.as_ref()
    }

    pub fn certificate(&self) -> &X509Certificate {
        &self.certificate
    }

    pub fn issuer_serial(&self) -> IssuerSerial {
        IssuerSerial::from_certificate(&self.certificate)
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("key_id", &self.handle.key_id())
            .field("subject", &self.certificate.subject_name())
            .field("serial", &self.certificate.serial_decimal())
            .finish()
    }
}
