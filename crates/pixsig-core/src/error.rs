#![forbid(unsafe_code)]

/// Errors produced by the pixsig signature engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed XML input: {0}")]
    MalformedInput(String),

    #[error("disallowed XML construct: {0}")]
    DisallowedConstruct(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("ambiguous element: {0}")]
    AmbiguousElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("certificate outside its validity window: {0}")]
    ExpiredCertificate(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("signing failed: {0}")]
    Signing(#[source] Box<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any failure raised while producing a signature.
    ///
    /// An error that is already a `Signing` error is returned as-is so
    /// callers never see nested wrappers.
    pub fn signing(source: Error) -> Self {
        match source {
            Error::Signing(_) => source,
            other => Error::Signing(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
