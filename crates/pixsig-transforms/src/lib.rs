#![forbid(unsafe_code)]

//! Reference processing for pixsig: URI dereferencing and the transform
//! chain (enveloped-signature, Exclusive C14N) applied before digesting.

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use pipeline::{Transform, TransformData, TransformPipeline, TransformSpec};
pub use uri::{DefaultDereferencer, Iso20022Dereferencer, UriDereferencer};
