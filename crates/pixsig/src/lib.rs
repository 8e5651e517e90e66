#![forbid(unsafe_code)]

//! XML-DSig signing and verification for Pix/ISO 20022 messages.

pub mod config;

pub use pixsig_c14n as c14n;
pub use pixsig_core as core;
pub use pixsig_crypto as crypto;
pub use pixsig_dsig as dsig;
pub use pixsig_keys as keys;
pub use pixsig_transforms as transforms;
pub use pixsig_xml as xml;

pub use config::{ProfileKind, SignerArgs, SignerConfig};
pub use pixsig_core::{Error, Result};
pub use pixsig_dsig::{GenericProfile, Iso20022Profile, SignatureProfile, VerificationOutcome, XmlSigner};
pub use pixsig_keys::{SigningIdentity, TrustStore, X509Certificate};
