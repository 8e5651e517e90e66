#![forbid(unsafe_code)]

//! `<KeyInfo>` carrying `X509Data/X509IssuerSerial`.
//!
//! Only the issuer name and serial number of the signing certificate are
//! placed on the wire; the certificate itself never is.

use crate::x509::X509Certificate;
use pixsig_core::{ns, Error};
use pixsig_xml::{Document, NodeId, QName};

/// Issuer name and serial number identifying a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSerial {
    pub issuer_name: String,
    /// Decimal serial number.
    pub serial_number: String,
}

impl IssuerSerial {
    pub fn from_certificate(cert: &X509Certificate) -> Self {
        Self {
            issuer_name: cert.issuer_name().to_owned(),
            serial_number: cert.serial_decimal().to_owned(),
        }
    }
}

/// Append `<KeyInfo Id=..><X509Data><X509IssuerSerial>..` under `parent`
/// in the XML-DSig namespace with the given prefix.
pub fn write_key_info(
    doc: &mut Document,
    parent: NodeId,
    prefix: &str,
    id: &str,
    issuer_serial: &IssuerSerial,
) -> Result<NodeId, Error> {
    let dsig = |local: &str| QName::namespaced(prefix, local, ns::DSIG);

    let key_info = doc.append_element(parent, dsig(ns::node::KEY_INFO))?;
    doc.set_attribute(key_info, ns::attr::ID, id)?;
    let x509_data = doc.append_element(key_info, dsig(ns::node::X509_DATA))?;
    let serial = doc.append_element(x509_data, dsig(ns::node::X509_ISSUER_SERIAL))?;
    let name_el = doc.append_element(serial, dsig(ns::node::X509_ISSUER_NAME))?;
    doc.set_text(name_el, &issuer_serial.issuer_name)?;
    let number_el = doc.append_element(serial, dsig(ns::node::X509_SERIAL_NUMBER))?;
    doc.set_text(number_el, &issuer_serial.serial_number)?;
    Ok(key_info)
}

/// Read the first `X509IssuerSerial` under a `<KeyInfo>` element.
pub fn read_issuer_serial(doc: &Document, key_info: NodeId) -> Result<IssuerSerial, Error> {
    let issuer_serial = doc
        .child_elements(key_info)
        .filter(|c| is_dsig(doc, *c, ns::node::X509_DATA))
        .find_map(|data| doc.find_child_element(data, ns::DSIG, ns::node::X509_ISSUER_SERIAL))
        .ok_or_else(|| Error::MissingElement("X509Data/X509IssuerSerial".into()))?;

    let issuer_name = doc
        .find_child_element(issuer_serial, ns::DSIG, ns::node::X509_ISSUER_NAME)
        .map(|n| doc.text_content(n).trim().to_owned())
        .ok_or_else(|| Error::MissingElement(ns::node::X509_ISSUER_NAME.into()))?;
    let serial_number = doc
        .find_child_element(issuer_serial, ns::DSIG, ns::node::X509_SERIAL_NUMBER)
        .map(|n| doc.text_content(n).trim().to_owned())
        .ok_or_else(|| Error::MissingElement(ns::node::X509_SERIAL_NUMBER.into()))?;

    Ok(IssuerSerial {
        issuer_name,
        serial_number,
    })
}

fn is_dsig(doc: &Document, id: NodeId, local: &str) -> bool {
    doc.element(id)
        .is_some_and(|e| e.namespace() == ns::DSIG && e.local_name() == local)
}
