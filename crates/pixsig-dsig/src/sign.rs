#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! Builds `<ds:Signature>` from a profile's reference list, places it at the
//! profile's envelope, then fills in digests and the signature value.

use crate::profile::{ReferenceSpec, SignatureProfile};
use crate::reference;
use base64::Engine;
use pixsig_c14n::C14nMode;
use pixsig_core::{algorithm, ns, Error};
use pixsig_crypto::{RsaSha256, SignatureAlgorithm};
use pixsig_keys::{keyinfo, SigningIdentity};
use pixsig_xml::{Document, NodeId, QName};
use tracing::debug;
use uuid::Uuid;

/// Sign `doc` in place and return the new `<Signature>` element.
pub fn sign_document(
    doc: &mut Document,
    identity: &SigningIdentity,
    profile: &dyn SignatureProfile,
) -> Result<NodeId, Error> {
    let key_info_id = Uuid::new_v4().to_string();
    let references = profile.references(&key_info_id);
    let envelope = profile.locate_envelope(doc)?;

    let template = build_template(doc, envelope, &references)?;
    keyinfo::write_key_info(
        doc,
        template.signature,
        ns::DSIG_PREFIX,
        &key_info_id,
        &identity.issuer_serial(),
    )?;

    let engine = base64::engine::general_purpose::STANDARD;
    for (spec, digest_value) in references.iter().zip(&template.digest_values) {
        let value = reference::compute_digest(
            doc,
            template.signature,
            spec,
            profile.dereferencer(),
        )?;
        doc.set_text(*digest_value, &engine.encode(value))?;
    }

    let method = RsaSha256;
    let c14n_signed_info =
        reference::canonicalize_signed_info(doc, template.signed_info, C14nMode::Exclusive, &[])?;
    let signature = identity
        .handle()
        .sign_digest(&method.signing_digest(&c14n_signed_info))?;
    doc.set_text(template.signature_value, &engine.encode(signature))?;

    debug!(
        profile = profile.name(),
        key_id = identity.handle().key_id(),
        references = references.len(),
        "signed document"
    );
    Ok(template.signature)
}

struct Template {
    signature: NodeId,
    signed_info: NodeId,
    digest_values: Vec<NodeId>,
    signature_value: NodeId,
}

fn build_template(
    doc: &mut Document,
    envelope: NodeId,
    references: &[ReferenceSpec],
) -> Result<Template, Error> {
    let ds = |local: &str| QName::namespaced(ns::DSIG_PREFIX, local, ns::DSIG);

    let signature = doc.append_element(envelope, ds(ns::node::SIGNATURE))?;
    doc.declare_namespace(signature, ns::DSIG_PREFIX, ns::DSIG)?;

    let signed_info = doc.append_element(signature, ds(ns::node::SIGNED_INFO))?;
    let c14n = doc.append_element(signed_info, ds(ns::node::CANONICALIZATION_METHOD))?;
    doc.set_attribute(c14n, ns::attr::ALGORITHM, algorithm::POLICY_C14N)?;
    let method = doc.append_element(signed_info, ds(ns::node::SIGNATURE_METHOD))?;
    doc.set_attribute(method, ns::attr::ALGORITHM, algorithm::POLICY_SIGNATURE)?;

    let mut digest_values = Vec::with_capacity(references.len());
    for spec in references {
        let reference = doc.append_element(signed_info, ds(ns::node::REFERENCE))?;
        if let Some(uri) = &spec.uri {
            doc.set_attribute(reference, ns::attr::URI, uri)?;
        }
        if !spec.transforms.is_empty() {
            let transforms = doc.append_element(reference, ds(ns::node::TRANSFORMS))?;
            for t in &spec.transforms {
                let transform = doc.append_element(transforms, ds(ns::node::TRANSFORM))?;
                doc.set_attribute(transform, ns::attr::ALGORITHM, &t.algorithm)?;
            }
        }
        let digest_method = doc.append_element(reference, ds(ns::node::DIGEST_METHOD))?;
        doc.set_attribute(digest_method, ns::attr::ALGORITHM, &spec.digest_method)?;
        digest_values.push(doc.append_element(reference, ds(ns::node::DIGEST_VALUE))?);
    }

    let signature_value = doc.append_element(signature, ds(ns::node::SIGNATURE_VALUE))?;

    Ok(Template {
        signature,
        signed_info,
        digest_values,
        signature_value,
    })
}
