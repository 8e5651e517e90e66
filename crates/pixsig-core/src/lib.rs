#![forbid(unsafe_code)]

//! Shared definitions for the pixsig XML signature engine.
//!
//! Holds the error taxonomy, the algorithm URIs fixed by the signing
//! policy, and the XML-DSig / ISO 20022 element names used across crates.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
