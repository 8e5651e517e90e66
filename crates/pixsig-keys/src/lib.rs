#![forbid(unsafe_code)]

//! Keys, certificates and trust for pixsig.
//!
//! Loads RSA keys and X.509 certificates from PEM or DER, keeps an ordered
//! trust store, and resolves verification keys from the
//! `X509IssuerSerial` carried in a signature's `<KeyInfo>`.

pub mod dn;
pub mod identity;
pub mod keyinfo;
pub mod loader;
pub mod resolver;
pub mod truststore;
pub mod x509;

pub use identity::SigningIdentity;
pub use keyinfo::IssuerSerial;
pub use resolver::{resolve, resolve_at, X509IssuerSerialKeySelector};
pub use truststore::{TrustEntry, TrustStore};
pub use x509::X509Certificate;
