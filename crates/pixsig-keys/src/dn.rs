#![forbid(unsafe_code)]

//! Distinguished name comparison.
//!
//! Issuer names arrive as strings: from `X509IssuerName` on the wire and
//! from the RFC 4514 rendering of a certificate's issuer.  Two names are
//! equal when their RDN sequences match after normalization: attribute
//! types compared case-insensitively, values compared case-insensitively
//! with escapes decoded and runs of whitespace collapsed.  The AVAs of a
//! multi-valued RDN are compared as a set.

use pixsig_core::Error;

/// A parsed, normalized distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    rdns: Vec<Vec<(String, String)>>,
}

impl DistinguishedName {
    /// Parse a string representation (RFC 4514 / RFC 2253 style).
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut rdns = Vec::new();
        for rdn in split_unescaped(s, &[',', ';']) {
            if rdn.trim().is_empty() {
                continue;
            }
            let mut avas = Vec::new();
            for ava in split_unescaped(&rdn, &['+']) {
                let parts = split_unescaped(&ava, &['=']);
                let (attr_type, value) = match parts.split_first() {
                    Some((t, rest)) if !rest.is_empty() => (t.clone(), rest.join("=")),
                    _ => {
                        return Err(Error::Certificate(format!(
                            "invalid attribute in distinguished name: {ava}"
                        )))
                    }
                };
                avas.push((normalize_type(&attr_type), normalize_value(&value)));
            }
            avas.sort();
            rdns.push(avas);
        }
        Ok(Self { rdns })
    }

    /// Whether two name strings denote the same name.  Unparseable names
    /// never match.
    pub fn matches(a: &str, b: &str) -> bool {
        match (Self::parse(a), Self::parse(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }
}

// Split on any of `seps` not preceded by a backslash or inside quotes.
// Escapes are kept so later stages can decode them.
fn split_unescaped(s: &str, seps: &[char]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if !quoted && seps.contains(&c) => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn normalize_type(t: &str) -> String {
    let t = t.trim();
    let t = t
        .strip_prefix("OID.")
        .or_else(|| t.strip_prefix("oid."))
        .unwrap_or(t);
    match t.to_ascii_uppercase().as_str() {
        "2.5.4.3" => "CN".to_owned(),
        "2.5.4.6" => "C".to_owned(),
        "2.5.4.7" => "L".to_owned(),
        "2.5.4.8" | "S" => "ST".to_owned(),
        "2.5.4.10" => "O".to_owned(),
        "2.5.4.11" => "OU".to_owned(),
        "2.5.4.5" | "SERIALNUMBER" => "SERIALNUMBER".to_owned(),
        "1.2.840.113549.1.9.1" | "E" | "EMAIL" => "EMAILADDRESS".to_owned(),
        other => other.to_owned(),
    }
}

fn normalize_value(v: &str) -> String {
    let v = v.trim();
    let v = match v.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner,
        None => v,
    };
    let decoded = decode_escapes(v);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn decode_escapes(v: &str) -> String {
    let mut bytes: Vec<u8> = Vec::with_capacity(v.len());
    let raw = v.as_bytes();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            let hex = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(b) => {
                    bytes.push(b);
                    i += 3;
                }
                None => {
                    bytes.push(raw[i + 1]);
                    i += 2;
                }
            }
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
