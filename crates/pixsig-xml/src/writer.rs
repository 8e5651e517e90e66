#![forbid(unsafe_code)]

//! Serialization of an owned [`Document`] back to UTF-8 text.
//!
//! Tags, attribute values and text go through uppsala's `XmlWriter`.  It
//! has no calls for comments or processing instructions, and no way to ask
//! for the character references that keep attribute whitespace intact
//! across a re-parse.  Those nodes, and start tags whose attribute values
//! carry `\t`, `\n` or `\r`, are rendered with [`crate::escape`] instead.

use crate::document::{Document, Element, NodeId, NodeKind};
use crate::escape::{escape_attr_into, escape_text_into};

/// Serialize the whole document, preceded by the XML declaration.
pub fn serialize(doc: &Document) -> String {
    let mut sink = Sink::new();
    sink.writer().write_declaration();

    let mut stack: Vec<Step> = Vec::new();
    push_children(doc, doc.root(), &mut stack);
    while let Some(step) = stack.pop() {
        match step {
            Step::Close { name, raw: false } => {
                sink.writer().end_element(&name);
            }
            Step::Close { name, raw: true } => {
                sink.raw("</");
                sink.raw(&name);
                sink.raw(">");
            }
            Step::Enter(id) => match doc.node_kind(id) {
                Some(NodeKind::Document) => push_children(doc, id, &mut stack),
                Some(NodeKind::Element(elem)) => {
                    let name = elem.name.qualified();
                    let has_children = doc.children(id).next().is_some();
                    let raw = needs_char_refs(elem);
                    let attrs = start_tag_attributes(elem);
                    if raw {
                        sink.raw_start_tag(&name, &attrs, has_children);
                    } else {
                        let pairs: Vec<(&str, &str)> =
                            attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
                        if has_children {
                            sink.writer().start_element(&name, &pairs);
                        } else {
                            sink.writer().empty_element(&name, &pairs);
                        }
                    }
                    if has_children {
                        stack.push(Step::Close { name, raw });
                        push_children(doc, id, &mut stack);
                    }
                }
                Some(NodeKind::Text(text)) => {
                    if text.contains('\r') {
                        let mut escaped = String::with_capacity(text.len());
                        escape_text_into(text, &mut escaped);
                        sink.raw(&escaped);
                    } else {
                        sink.writer().text(text);
                    }
                }
                Some(NodeKind::Comment(text)) => {
                    sink.raw("<!--");
                    sink.raw(text);
                    sink.raw("-->");
                }
                Some(NodeKind::ProcessingInstruction(pi)) => {
                    sink.raw("<?");
                    sink.raw(&pi.target);
                    if let Some(data) = pi.data.as_deref().filter(|d| !d.is_empty()) {
                        sink.raw(" ");
                        sink.raw(data);
                    }
                    sink.raw("?>");
                }
                None => {}
            },
        }
    }
    sink.finish()
}

enum Step {
    Enter(NodeId),
    Close { name: String, raw: bool },
}

fn push_children(doc: &Document, id: NodeId, stack: &mut Vec<Step>) {
    let start = stack.len();
    stack.extend(doc.children(id).map(Step::Enter));
    stack[start..].reverse();
}

/// Namespace declarations followed by attributes, as written in the start tag.
fn start_tag_attributes(elem: &Element) -> Vec<(String, String)> {
    let mut attrs = Vec::with_capacity(elem.namespace_declarations.len() + elem.attributes.len());
    for (prefix, uri) in &elem.namespace_declarations {
        let name = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{prefix}")
        };
        attrs.push((name, uri.clone()));
    }
    for attr in &elem.attributes {
        attrs.push((attr.name.qualified(), attr.value.clone()));
    }
    attrs
}

fn needs_char_refs(elem: &Element) -> bool {
    let special = |v: &str| v.contains(['\t', '\n', '\r']);
    elem.attributes.iter().any(|a| special(a.value.as_str()))
        || elem
            .namespace_declarations
            .iter()
            .any(|(_, uri)| special(uri.as_str()))
}

/// Output buffer that interleaves `XmlWriter` runs with directly rendered markup.
struct Sink {
    out: String,
    writer: Option<uppsala::XmlWriter>,
}

impl Sink {
    fn new() -> Self {
        Self {
            out: String::new(),
            writer: None,
        }
    }

    fn writer(&mut self) -> &mut uppsala::XmlWriter {
        self.writer.get_or_insert_with(uppsala::XmlWriter::new)
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.take() {
            self.out.push_str(&writer.into_string());
        }
    }

    fn raw(&mut self, s: &str) {
        self.flush();
        self.out.push_str(s);
    }

    fn raw_start_tag(&mut self, name: &str, attrs: &[(String, String)], has_children: bool) {
        self.flush();
        self.out.push('<');
        self.out.push_str(name);
        for (attr_name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(attr_name);
            self.out.push_str("=\"");
            escape_attr_into(value, &mut self.out);
            self.out.push('"');
        }
        self.out.push_str(if has_children { ">" } else { "/>" });
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}
