#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use crate::enveloped::EnvelopedSignatureTransform;
use pixsig_c14n::C14nMode;
use pixsig_core::{algorithm, Error};
use pixsig_xml::{Document, NodeId, NodeSet};
use tracing::trace;

/// Data flowing through the transform pipeline.
pub enum TransformData<'a> {
    /// A node set over a parsed document.
    Xml { doc: &'a Document, node_set: NodeSet },
    /// Raw octets.
    Binary(Vec<u8>),
}

impl TransformData<'_> {
    /// The octets to digest.
    ///
    /// Every reference is expected to end in a canonicalization transform,
    /// so a node set reaching the digest is an error.
    pub fn into_binary(self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml { .. } => Err(Error::Transform(
                "reference does not end with a canonicalization transform".into(),
            )),
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error>;
}

/// A transform as named in a `<Transform>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSpec {
    pub algorithm: String,
    /// `InclusiveNamespaces/@PrefixList` for exclusive canonicalization.
    pub inclusive_prefixes: Vec<String>,
}

impl TransformSpec {
    pub fn new(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_owned(),
            inclusive_prefixes: Vec::new(),
        }
    }

    pub fn enveloped_signature() -> Self {
        Self::new(algorithm::ENVELOPED_SIGNATURE)
    }

    pub fn exc_c14n() -> Self {
        Self::new(algorithm::EXC_C14N)
    }
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline for a reference inside the signature at `signature`.
    pub fn from_specs(specs: &[TransformSpec], signature: NodeId) -> Result<Self, Error> {
        let mut pipeline = Self::new();
        for spec in specs {
            if spec.algorithm == algorithm::ENVELOPED_SIGNATURE {
                pipeline.push(Box::new(EnvelopedSignatureTransform::new(signature)));
            } else if let Some(mode) = C14nMode::from_uri(&spec.algorithm) {
                pipeline.push(Box::new(C14nTransform::new(mode, spec.inclusive_prefixes.clone())));
            } else {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "transform: {}",
                    spec.algorithm
                )));
            }
        }
        Ok(pipeline)
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let mut data = input;
        for transform in &self.transforms {
            trace!(transform = transform.uri(), "applying transform");
            data = transform.execute(data)?;
        }
        Ok(data)
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let bytes = match input {
            TransformData::Xml { doc, node_set } => pixsig_c14n::canonicalize(
                doc,
                self.mode,
                Some(&node_set),
                &self.inclusive_prefixes,
            )?,
            TransformData::Binary(data) => {
                let doc = pixsig_xml::parse(&data)?;
                pixsig_c14n::canonicalize(&doc, self.mode, None, &self.inclusive_prefixes)?
            }
        };
        Ok(TransformData::Binary(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixsig_xml::parse_str;

    #[test]
    fn test_pipeline_enveloped_then_c14n() {
        let doc = parse_str(
            r#"<r b="2" a="1"><x/><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature></r>"#,
        )
        .unwrap();
        let sig = doc.find_element(pixsig_core::ns::DSIG, "Signature").unwrap();
        let pipeline = TransformPipeline::from_specs(
            &[TransformSpec::enveloped_signature(), TransformSpec::exc_c14n()],
            sig,
        )
        .unwrap();
        let out = pipeline
            .execute(TransformData::Xml {
                doc: &doc,
                node_set: NodeSet::all_without_comments(&doc),
            })
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"<r a="1" b="2"><x></x></r>"#);
    }

    #[test]
    fn test_unknown_transform_rejected() {
        let doc = parse_str("<r/>").unwrap();
        let r = doc.document_element().unwrap();
        let spec = TransformSpec::new("http://www.w3.org/TR/1999/REC-xslt-19991116");
        assert!(matches!(
            TransformPipeline::from_specs(&[spec], r),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_node_set_without_c14n_is_error() {
        let doc = parse_str("<r/>").unwrap();
        let data = TransformData::Xml {
            doc: &doc,
            node_set: NodeSet::all_without_comments(&doc),
        };
        assert!(data.into_binary().is_err());
    }
}
