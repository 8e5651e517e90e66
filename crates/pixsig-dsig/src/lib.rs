#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) signing and verification for pixsig.
//!
//! Signatures are enveloped, use Exclusive C14N, SHA-256 digests and
//! RSA-SHA256, and identify the signer by issuer name and serial number.

pub mod profile;
pub mod reference;
pub mod sign;
pub mod signer;
pub mod verify;

pub use profile::{GenericProfile, Iso20022Profile, ReferenceSpec, SignatureProfile};
pub use signer::XmlSigner;
pub use verify::{ReferenceStatus, VerificationOutcome};
