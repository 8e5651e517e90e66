#![forbid(unsafe_code)]

//! RSA-SHA256 signatures and the signing-key capability.
//!
//! Private keys never need to be in process memory: the signer only holds
//! a [`SigningKeyHandle`] that is asked to sign a precomputed SHA-256
//! digest.  Verification always happens locally with a public key.

use pixsig_core::{algorithm, Error};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

/// A private key able to produce RSASSA-PKCS1-v1_5 signatures over a
/// SHA-256 digest.
///
/// Implementations may forward to an HSM or a cloud KMS; they must be
/// safe to share between threads.
pub trait SigningKeyHandle: Send + Sync {
    /// Identifier of the key, used only for diagnostics.
    fn key_id(&self) -> &str;

    /// Sign a 32-byte SHA-256 digest, returning the raw signature bytes.
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, Error>;
}

/// A signing handle over an RSA private key held in memory.
pub struct RsaKeyHandle {
    key_id: String,
    key: RsaPrivateKey,
}

impl RsaKeyHandle {
    pub fn new(key_id: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }
}

impl fmt::Debug for RsaKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyHandle")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl SigningKeyHandle for RsaKeyHandle {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, Error> {
        if digest.len() != 32 {
            return Err(Error::Crypto(format!(
                "SHA-256 digest must be 32 bytes, got {}",
                digest.len()
            )));
        }
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
    }
}

/// Trait for signature algorithms, as named by SignatureMethod.
pub trait SignatureAlgorithm: Send + Sync {
    /// Digest to hand to a [`SigningKeyHandle`] for `data`.
    fn signing_digest(&self, data: &[u8]) -> Vec<u8>;

    fn verify(&self, key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    match uri {
        algorithm::RSA_SHA256 => Ok(Box::new(RsaSha256)),
        _ => Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    }
}

/// RSASSA-PKCS1-v1_5 with SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSha256;

impl SignatureAlgorithm for RsaSha256 {
    fn signing_digest(&self, data: &[u8]) -> Vec<u8> {
        crate::digest::sha256(data)
    }

    fn verify(&self, key: &RsaPublicKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        let vk = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
        Ok(vk.verify(data, &sig).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;

    const SIGNER_KEY: &str = include_str!("../../../test-data/signer.key");
    const OTHER_KEY: &str = include_str!("../../../test-data/counterparty.key");

    fn handle(pem: &str) -> RsaKeyHandle {
        RsaKeyHandle::new("test", RsaPrivateKey::from_pkcs8_pem(pem).unwrap())
    }

    #[test]
    fn test_rsa_sha256_sign_verify() {
        let h = handle(SIGNER_KEY);
        let alg = from_uri(algorithm::RSA_SHA256).unwrap();
        let data = b"<SignedInfo></SignedInfo>";
        let sig = h.sign_digest(&alg.signing_digest(data)).unwrap();
        assert_eq!(sig.len(), 256);
        assert!(alg.verify(&h.public_key(), data, &sig).unwrap());
        assert!(!alg.verify(&h.public_key(), b"tampered", &sig).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let h = handle(SIGNER_KEY);
        let other = handle(OTHER_KEY);
        let alg = RsaSha256;
        let sig = h.sign_digest(&alg.signing_digest(b"data")).unwrap();
        assert!(!alg.verify(&other.public_key(), b"data", &sig).unwrap());
    }

    #[test]
    fn test_bad_digest_length() {
        let h = handle(SIGNER_KEY);
        assert!(matches!(h.sign_digest(b"short"), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_rsa_sha1_unsupported() {
        assert!(from_uri(algorithm::RSA_SHA1).is_err());
    }
}
