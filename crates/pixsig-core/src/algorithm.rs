#![forbid(unsafe_code)]

//! Algorithm URI constants for XML-DSig.
//!
//! The signing policy fixes SHA-256 digests, RSA-SHA256 signatures and
//! Exclusive C14N; the remaining constants are recognised so that a
//! verifier can report them by name when a peer uses something else.

// ── Canonicalization ─────────────────────────────────────────────────

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

// ── Digest algorithms ────────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

// ── Signature algorithms ─────────────────────────────────────────────

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

// ── Transform algorithms ─────────────────────────────────────────────

pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

// ── Policy ───────────────────────────────────────────────────────────

/// Digest used for every reference.
pub const POLICY_DIGEST: &str = SHA256;
/// Signature method for SignedInfo.
pub const POLICY_SIGNATURE: &str = RSA_SHA256;
/// Canonicalization for SignedInfo and every per-reference transform.
pub const POLICY_C14N: &str = EXC_C14N;
