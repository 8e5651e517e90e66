#![forbid(unsafe_code)]

//! Cryptographic primitives for pixsig: SHA-256 digests, RSA-SHA256
//! signature verification, and the [`SigningKeyHandle`] capability used
//! to obtain signatures from keys held elsewhere.

pub mod digest;
pub mod sign;

pub use crate::digest::DigestAlgorithm;
pub use sign::{RsaKeyHandle, RsaSha256, SignatureAlgorithm, SigningKeyHandle};
