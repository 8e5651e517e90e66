#![forbid(unsafe_code)]

//! Hardened XML parsing into an owned [`Document`].
//!
//! Input goes through three gates before a tree is built:
//! - a nesting-depth scan, so no parser or tree walk recurses without bound;
//! - `roxmltree` with DTDs refused and a node ceiling, so no entity can be
//!   declared, nothing external is fetched and memory use stays bounded;
//! - `uppsala`, whose tree keeps the prefixes exactly as written.
//!
//! The `uppsala` tree is then copied into the mutable arena.

use crate::document::{Attribute, Document, Element, NodeId, NodeKind, ProcessingInstruction, QName};
use pixsig_core::{ns, Error};

/// Default ceiling on the number of parsed nodes.
pub const DEFAULT_NODES_LIMIT: u32 = 1_000_000;

/// Default ceiling on element nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options for [`parse_with_options`].
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub nodes_limit: u32,
    pub max_depth: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            nodes_limit: DEFAULT_NODES_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Return roxmltree parsing options with DTD processing disabled.
pub fn parsing_options(options: &LoaderOptions) -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        nodes_limit: options.nodes_limit,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse UTF-8 bytes with the default options.
pub fn parse(data: &[u8]) -> Result<Document, Error> {
    parse_with_options(data, &LoaderOptions::default())
}

/// Parse a string with the default options.
pub fn parse_str(text: &str) -> Result<Document, Error> {
    parse_str_with_options(text, &LoaderOptions::default())
}

pub fn parse_with_options(data: &[u8], options: &LoaderOptions) -> Result<Document, Error> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::MalformedInput(format!("invalid UTF-8: {e}")))?;
    parse_str_with_options(text, options)
}

pub fn parse_str_with_options(text: &str, options: &LoaderOptions) -> Result<Document, Error> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    check_depth(text, options.max_depth)?;
    roxmltree::Document::parse_with_options(text, parsing_options(options))
        .map_err(map_parse_error)?;
    let source = uppsala::parse(text).map_err(|e| Error::MalformedInput(e.to_string()))?;
    copy_tree(&source)
}

fn map_parse_error(e: roxmltree::Error) -> Error {
    match e {
        roxmltree::Error::DtdDetected => {
            Error::DisallowedConstruct("DOCTYPE declarations are not allowed".into())
        }
        roxmltree::Error::NodesLimitReached => {
            Error::DisallowedConstruct("document exceeds the node limit".into())
        }
        roxmltree::Error::EntityReferenceLoop(_) => {
            Error::DisallowedConstruct(e.to_string())
        }
        other => Error::MalformedInput(other.to_string()),
    }
}

// ── Depth scan ───────────────────────────────────────────────────────

/// Reject documents whose elements nest deeper than `max_depth`.
///
/// Only markup is tracked: comments, CDATA sections, processing
/// instructions and declarations are skipped, and quoted attribute values
/// may contain `>`.  Malformed markup is left for the parser to report.
pub fn check_depth(text: &str, max_depth: usize) -> Result<(), Error> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|b| *b == b'<') {
        i += offset;
        let rest = &bytes[i..];
        if rest.starts_with(b"<!--") {
            i = skip_past(bytes, i + 4, b"-->");
        } else if rest.starts_with(b"<![CDATA[") {
            i = skip_past(bytes, i + 9, b"]]>");
        } else if rest.starts_with(b"<?") {
            i = skip_past(bytes, i + 2, b"?>");
        } else if rest.starts_with(b"<!") {
            i = skip_past(bytes, i + 2, b">");
        } else if rest.starts_with(b"</") {
            depth = depth.saturating_sub(1);
            i = skip_past(bytes, i + 2, b">");
        } else {
            let (end, self_closing) = start_tag_end(bytes, i + 1);
            if !self_closing {
                depth += 1;
                if depth > max_depth {
                    return Err(Error::DisallowedConstruct(format!(
                        "element nesting exceeds {max_depth} levels"
                    )));
                }
            }
            i = end;
        }
    }
    Ok(())
}

fn skip_past(bytes: &[u8], from: usize, pattern: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.windows(pattern.len()).position(|w| w == pattern))
        .map_or(bytes.len(), |p| from + p + pattern.len())
}

/// Index just past the start tag beginning at `from`, and whether it
/// closes itself.
fn start_tag_end(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut quote: Option<u8> = None;
    let mut i = from;
    while let Some(&b) = bytes.get(i) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return (i + 1, i > from && bytes[i - 1] == b'/'),
            (None, _) => {}
        }
        i += 1;
    }
    (bytes.len(), false)
}

// ── Tree copy ────────────────────────────────────────────────────────

fn copy_tree(source: &uppsala::Document<'_>) -> Result<Document, Error> {
    let mut doc = Document::new();
    let mut stack: Vec<(uppsala::NodeId, NodeId)> = Vec::new();
    push_children(source, source.root(), doc.root(), &mut stack);

    while let Some((src, parent)) = stack.pop() {
        let kind = match source.node_kind(src) {
            Some(uppsala::NodeKind::Element(_)) => match source.element(src) {
                Some(elem) => {
                    let mut attributes = Vec::new();
                    for attr in &elem.attributes {
                        attributes.push(convert_attribute(attr));
                    }
                    let mut namespace_declarations = Vec::new();
                    for (prefix, uri) in &elem.namespace_declarations {
                        namespace_declarations.push((prefix.to_string(), uri.to_string()));
                    }
                    NodeKind::Element(Element {
                        name: QName {
                            prefix: elem.name.prefix.as_deref().map(str::to_owned),
                            local_name: elem.name.local_name.to_string(),
                            namespace_uri: elem.name.namespace_uri.as_deref().map(str::to_owned),
                        },
                        attributes,
                        namespace_declarations,
                    })
                }
                None => continue,
            },
            Some(uppsala::NodeKind::Text(text)) | Some(uppsala::NodeKind::CData(text)) => {
                NodeKind::Text(text.to_string())
            }
            Some(uppsala::NodeKind::Comment(text)) => NodeKind::Comment(text.to_string()),
            Some(uppsala::NodeKind::ProcessingInstruction(pi)) => {
                NodeKind::ProcessingInstruction(ProcessingInstruction {
                    target: pi.target.to_string(),
                    data: pi.data.as_deref().map(str::to_owned),
                })
            }
            _ => continue,
        };
        let id = doc.create_node(kind);
        doc.append_child(parent, id)?;
        push_children(source, src, id, &mut stack);
    }
    Ok(doc)
}

// Children go on the stack last-first so they are copied in document order.
fn push_children(
    source: &uppsala::Document<'_>,
    src: uppsala::NodeId,
    parent: NodeId,
    stack: &mut Vec<(uppsala::NodeId, NodeId)>,
) {
    let start = stack.len();
    for child in source.children(src) {
        stack.push((child, parent));
    }
    stack[start..].reverse();
}

/// The attribute with the prefix it was written with.
fn convert_attribute(attr: &uppsala::Attribute<'_>) -> Attribute {
    let namespace_uri = attr.name.namespace_uri.as_deref();
    let prefix = match namespace_uri {
        Some(ns::XML) => Some("xml".to_owned()),
        Some(_) => attr.name.prefix.as_deref().map(str::to_owned),
        None => None,
    };
    Attribute {
        name: QName {
            prefix,
            local_name: attr.name.local_name.to_string(),
            namespace_uri: namespace_uri.map(str::to_owned),
        },
        value: attr.value.to_string(),
    }
}
