//! End-to-end signing and verification through `XmlSigner`.

use pixsig::core::{ns, Error};
use pixsig::crypto::{RsaKeyHandle, SigningKeyHandle};
use pixsig::keys::loader;
use pixsig::xml::loader::DEFAULT_MAX_DEPTH;
use pixsig::xml::{parse_str, serialize};
use pixsig::{SigningIdentity, TrustStore, X509Certificate, XmlSigner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const SIGNER_KEY: &str = include_str!("../../../test-data/signer.key");
const SIGNER_PEM: &str = include_str!("../../../test-data/signer.pem");
const ROTATED_PEM: &str = include_str!("../../../test-data/signer-rotated.pem");
const COUNTERPARTY_PEM: &str = include_str!("../../../test-data/counterparty.pem");
const EXPIRED_PEM: &str = include_str!("../../../test-data/expired.pem");
const RENEWED_PEM: &str = include_str!("../../../test-data/renewed.pem");
const PACS008: &str = include_str!("../../../test-data/pacs008.xml");
const PAYMENT: &str = include_str!("../../../test-data/payment.xml");

fn cert(pem: &str) -> X509Certificate {
    loader::load_certificate(pem.as_bytes()).unwrap()
}

fn identity() -> SigningIdentity {
    SigningIdentity::from_key_and_cert(SIGNER_KEY.as_bytes(), SIGNER_PEM.as_bytes()).unwrap()
}

fn store(pems: &[&str]) -> Arc<TrustStore> {
    Arc::new(TrustStore::from_certificates(
        "trusted",
        pems.iter().map(|p| cert(p)),
    ))
}

fn generic() -> XmlSigner {
    XmlSigner::generic(identity(), store(&[SIGNER_PEM]))
}

fn iso() -> XmlSigner {
    XmlSigner::iso20022(identity(), store(&[SIGNER_PEM]))
}

fn count(xml: &str, local: &str) -> usize {
    parse_str(xml)
        .unwrap()
        .find_elements_by_local_name(local)
        .len()
}

fn signing_cause(result: Result<String, Error>) -> Error {
    match result {
        Err(Error::Signing(inner)) => *inner,
        other => panic!("expected a signing error, got {other:?}"),
    }
}

// ── Round trips ──────────────────────────────────────────────────────

#[test]
fn test_generic_round_trip() {
    let signer = generic();
    let signed = signer.sign(PAYMENT).unwrap();
    assert!(signed.contains("<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">"));
    assert!(signer.verify(&signed));

    let doc = parse_str(&signed).unwrap();
    let sig = doc.find_element(ns::DSIG, ns::node::SIGNATURE).unwrap();
    assert_eq!(doc.parent(sig), doc.document_element());
}

#[test]
fn test_iso20022_round_trip() {
    let signer = iso();
    let signed = signer.sign(PACS008).unwrap();
    assert!(signer.verify(&signed));

    let outcome = signer.validate(&signed).unwrap();
    assert!(outcome.valid);
    let uris: Vec<Option<&str>> = outcome.references.iter().map(|r| r.uri.as_deref()).collect();
    assert_eq!(uris.len(), 3);
    assert!(uris[0].is_some_and(|u| u.starts_with('#')));
    assert_eq!(uris[1], Some(""));
    assert_eq!(uris[2], None);

    let doc = parse_str(&signed).unwrap();
    let sig = doc.find_element(ns::DSIG, ns::node::SIGNATURE).unwrap();
    let sgntr = doc.parent(sig).unwrap();
    assert_eq!(doc.element(sgntr).unwrap().local_name(), "Sgntr");
    assert_eq!(
        doc.element(sgntr).unwrap().namespace(),
        "urn:iso:std:iso:20022:tech:xsd:head.001.001.01"
    );
    let header = doc.parent(sgntr).unwrap();
    assert_eq!(doc.element(header).unwrap().local_name(), "AppHdr");
}

#[test]
fn test_key_info_carries_issuer_serial_only() {
    let signed = generic().sign(PAYMENT).unwrap();
    let doc = parse_str(&signed).unwrap();
    let name = doc.find_element(ns::DSIG, ns::node::X509_ISSUER_NAME).unwrap();
    let serial = doc.find_element(ns::DSIG, ns::node::X509_SERIAL_NUMBER).unwrap();
    assert_eq!(doc.text_content(serial), "4097");
    assert!(doc.text_content(name).contains("CN=pix-signer"));
    assert!(doc.find_element(ns::DSIG, "X509Certificate").is_none());
}

#[test]
fn test_generic_round_trip_namespace_shapes() {
    let cases = [
        (
            "default namespace undeclared",
            r#"<Msg xmlns="urn:pix:msg"><Inner xmlns=""><V>1</V></Inner><W>2</W></Msg>"#,
        ),
        (
            "comments and PIs in the body",
            "<Msg><Body><!-- note --><?audit id=7?><V>1</V></Body><?trail end?></Msg>",
        ),
        (
            "CDATA section",
            "<Msg><Memo><![CDATA[R$ <10> & more]]></Memo></Msg>",
        ),
        (
            "xml:lang and xml:space",
            r#"<Msg xml:lang="pt-BR"><Memo xml:space="preserve">  dois  espacos  </Memo></Msg>"#,
        ),
        (
            "two prefixes bound to one namespace",
            r#"<a:Msg xmlns:a="urn:x" xmlns:b="urn:x"><b:V b:cur="BRL" a:seq="1">10</b:V></a:Msg>"#,
        ),
        (
            "whitespace character references in attributes",
            "<Msg><V note=\"linha&#xA;quebrada&#x9;tab\">1</V></Msg>",
        ),
        (
            "markup around the document element",
            "<?xml version=\"1.0\"?><!--lead--><?head x?><Msg><V/></Msg><!--tail-->",
        ),
    ];

    let signer = generic();
    for (name, xml) in cases {
        let signed = signer.sign(xml).unwrap_or_else(|e| panic!("{name}: sign failed: {e}"));
        assert!(signer.verify(&signed), "{name}: signed output does not verify");

        let reserialized = serialize(&parse_str(&signed).unwrap());
        assert!(signer.verify(&reserialized), "{name}: reserialized output does not verify");

        let outcome = signer.validate(&signed).unwrap();
        assert!(outcome.references.iter().all(|r| r.valid), "{name}");
    }
}

#[test]
fn test_iso20022_round_trip_prefixed_header() {
    let xml = r#"<Envelope xmlns="urn:pix:env"><h:AppHdr xmlns:h="urn:iso:std:iso:20022:tech:xsd:head.001.001.01"><h:Fr>99999010</h:Fr><h:Sgntr><stale/></h:Sgntr></h:AppHdr><d:Document xmlns:d="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08"><d:Amt Ccy="BRL">1.00</d:Amt></d:Document></Envelope>"#;
    let signer = iso();
    let signed = signer.sign(xml).unwrap();
    assert!(signer.verify(&signed));
    assert!(!signed.contains("stale"));

    let doc = parse_str(&signed).unwrap();
    let sig = doc.find_element(ns::DSIG, ns::node::SIGNATURE).unwrap();
    let sgntr = doc.parent(sig).unwrap();
    assert_eq!(doc.element(sgntr).unwrap().name.qualified(), "h:Sgntr");
    let header = doc.parent(sgntr).unwrap();
    assert_eq!(doc.element(header).unwrap().name.qualified(), "h:AppHdr");

    let tampered = signed.replace(">1.00<", ">9.00<");
    let outcome = signer.validate(&tampered).unwrap();
    assert!(outcome.references[1].valid);
    assert!(!outcome.references[2].valid);
}

// ── Tampering ────────────────────────────────────────────────────────

#[test]
fn test_tampered_key_info_detected() {
    let signer = iso();
    let signed = signer.sign(PACS008).unwrap();
    let tampered = signed.replacen(
        "<ds:X509Data>",
        "<ds:KeyName>pix-signer</ds:KeyName><ds:X509Data>",
        1,
    );
    assert_ne!(signed, tampered);

    let outcome = signer.validate(&tampered).unwrap();
    assert!(outcome.signature_value_valid);
    assert!(!outcome.references[0].valid);
    assert!(outcome.references[1].valid);
    assert!(outcome.references[2].valid);
    assert!(!outcome.valid);
    assert!(!signer.verify(&tampered));
}

#[test]
fn test_tampered_body_detected() {
    let signer = iso();
    let signed = signer.sign(PACS008).unwrap();
    let tampered = signed.replace("150.75", "1500.75");
    assert_ne!(signed, tampered);
    assert!(!signer.verify(&tampered));

    let outcome = signer.validate(&tampered).unwrap();
    assert!(outcome.signature_value_valid);
    assert!(outcome.references[0].valid);
    assert!(outcome.references[1].valid);
    assert!(!outcome.references[2].valid);
}

#[test]
fn test_tampered_header_detected() {
    let signer = iso();
    let signed = signer.sign(PACS008).unwrap();
    let tampered = signed.replace("<Id>00038166</Id>", "<Id>00038167</Id>");
    let outcome = signer.validate(&tampered).unwrap();
    assert!(!outcome.valid);
    assert!(!outcome.references[1].valid);
    assert!(outcome.references[2].valid);
}

#[test]
fn test_tampered_signed_info_detected() {
    let signer = generic();
    let signed = signer.sign(PAYMENT).unwrap();
    let tampered = signed.replacen(
        "<ds:SignatureMethod ",
        "<ds:SignatureMethod Extra=\"1\" ",
        1,
    );
    let outcome = signer.validate(&tampered).unwrap();
    assert!(!outcome.signature_value_valid);
    assert!(!signer.verify(&tampered));
}

#[test]
fn test_iso_signature_not_valid_under_generic_profile() {
    let signed = iso().sign(PACS008).unwrap();
    assert!(!generic().verify(&signed));
}

// ── Re-signing ───────────────────────────────────────────────────────

#[test]
fn test_iso20022_resign_is_idempotent() {
    let signer = iso();
    let once = signer.sign(PACS008).unwrap();
    let twice = signer.sign(&once).unwrap();
    assert_eq!(count(&twice, "Signature"), 1);
    assert_eq!(count(&twice, "Sgntr"), 1);
    assert!(signer.verify(&twice));
}

// ── Key resolution ───────────────────────────────────────────────────

#[test]
fn test_partial_matches_are_not_trusted() {
    let signed = generic().sign(PAYMENT).unwrap();
    let verifier = XmlSigner::generic(identity(), store(&[ROTATED_PEM, COUNTERPARTY_PEM]));
    assert!(matches!(verifier.validate(&signed), Err(Error::KeyNotFound(_))));
    assert!(!verifier.verify(&signed));
}

#[test]
fn test_expired_certificate_has_no_fallback() {
    // The handle is trusted as given, so the expired certificate can be
    // named in KeyInfo without its original key.
    let key = loader::load_rsa_private_key(SIGNER_KEY.as_bytes()).unwrap();
    let handle = Arc::new(RsaKeyHandle::new("legacy", key));
    let legacy = SigningIdentity::new(handle, cert(EXPIRED_PEM));
    let signed = XmlSigner::generic(legacy, store(&[SIGNER_PEM]))
        .sign(PAYMENT)
        .unwrap();

    let verifier = XmlSigner::generic(identity(), store(&[EXPIRED_PEM, RENEWED_PEM]));
    assert!(matches!(
        verifier.validate(&signed),
        Err(Error::ExpiredCertificate(_))
    ));
    assert!(!verifier.verify(&signed));
}

#[test]
fn test_same_serial_other_issuer_is_skipped() {
    let signed = generic().sign(PAYMENT).unwrap();
    let verifier = XmlSigner::generic(identity(), store(&[COUNTERPARTY_PEM, SIGNER_PEM]));
    assert!(verifier.verify(&signed));
}

// ── Envelope errors ──────────────────────────────────────────────────

#[test]
fn test_missing_header_is_reported() {
    let xml = PACS008.replace("AppHdr", "Hdr");
    assert!(matches!(signing_cause(iso().sign(&xml)), Error::MissingElement(_)));
}

#[test]
fn test_two_headers_are_ambiguous() {
    let xml = "<Envelope><AppHdr/><AppHdr/><Document/></Envelope>";
    assert!(matches!(signing_cause(iso().sign(xml)), Error::AmbiguousElement(_)));
}

#[test]
fn test_verify_with_second_header_is_ambiguous() {
    let signer = iso();
    let signed = signer.sign(PACS008).unwrap();
    let doubled = signed.replacen("<Document", "<AppHdr/><Document", 1);
    assert!(matches!(
        signer.validate(&doubled),
        Err(Error::AmbiguousElement(_))
    ));
    assert!(!signer.verify(&doubled));
}

#[test]
fn test_missing_body_is_ambiguous() {
    let xml = "<Envelope><AppHdr><Fr/></AppHdr></Envelope>";
    assert!(matches!(signing_cause(iso().sign(xml)), Error::AmbiguousElement(_)));
}

// ── Input hardening ──────────────────────────────────────────────────

#[test]
fn test_doctype_rejected() {
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE r [<!ENTITY ext SYSTEM "http://attacker.invalid/x">]>
<r>&ext;</r>"#;
    assert!(matches!(
        signing_cause(generic().sign(xml)),
        Error::DisallowedConstruct(_)
    ));
    assert!(!generic().verify(xml));
}

#[test]
fn test_excessive_nesting_rejected() {
    let deep = format!(
        "<Msg>{}{}</Msg>",
        "<n>".repeat(2000),
        "</n>".repeat(2000)
    );
    assert!(matches!(
        signing_cause(generic().sign(&deep)),
        Error::DisallowedConstruct(_)
    ));
    assert!(!generic().verify(&deep));
    assert!(matches!(
        generic().validate(&deep),
        Err(Error::DisallowedConstruct(_))
    ));
}

#[test]
fn test_nesting_below_limit_round_trips() {
    let depth = DEFAULT_MAX_DEPTH - 16;
    let xml = format!(
        "<Msg>{}v{}</Msg>",
        "<n>".repeat(depth),
        "</n>".repeat(depth)
    );
    let signer = generic();
    let signed = signer.sign(&xml).unwrap();
    assert!(signer.verify(&signed));
}

#[test]
fn test_unsigned_input_does_not_verify() {
    assert!(!generic().verify(PAYMENT));
    assert!(!iso().verify(PACS008));
}

// ── Key handle ───────────────────────────────────────────────────────

struct CountingHandle {
    inner: RsaKeyHandle,
    calls: AtomicUsize,
}

impl SigningKeyHandle for CountingHandle {
    fn key_id(&self) -> &str {
        self.inner.key_id()
    }

    fn sign_digest(&self, digest: &[u8]) -> pixsig::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_digest(digest)
    }
}

#[test]
fn test_empty_input_never_reaches_key_handle() {
    let key = loader::load_rsa_private_key(SIGNER_KEY.as_bytes()).unwrap();
    let handle = Arc::new(CountingHandle {
        inner: RsaKeyHandle::new("counting", key),
        calls: AtomicUsize::new(0),
    });
    let signer = XmlSigner::iso20022(
        SigningIdentity::new(handle.clone(), cert(SIGNER_PEM)),
        store(&[SIGNER_PEM]),
    );

    assert_eq!(signer.sign("").unwrap(), "");
    assert_eq!(handle.calls.load(Ordering::SeqCst), 0);

    let signed = signer.sign(PACS008).unwrap();
    assert_eq!(handle.calls.load(Ordering::SeqCst), 1);
    assert!(signer.verify(&signed));
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn test_shared_signer_across_threads() {
    let signer = Arc::new(iso());
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let signer = Arc::clone(&signer);
            thread::spawn(move || {
                let xml = PACS008.replace("150.75", &format!("{i}.00"));
                let signed = signer.sign(&xml).unwrap();
                signer.verify(&signed)
            })
        })
        .collect();
    for worker in workers {
        assert!(worker.join().unwrap());
    }
}
