#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output.  A namespace
//! is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.

use crate::render::{Attr, NsDecl};
use pixsig_core::Error;
use pixsig_xml::escape::{escape_pi, escape_text_into};
use pixsig_xml::{Document, Element, NodeId, NodeKind, NodeSet};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
///
/// With no node set the whole subtree under `doc.root()` is output.
pub fn canonicalize(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let mut ctx = ExcC14nContext {
        doc,
        with_comments,
        node_set,
        inclusive_prefixes: inclusive_prefixes
            .iter()
            .map(|p| if p == "#default" { String::new() } else { p.clone() })
            .collect(),
        output: String::new(),
    };
    ctx.process_node(doc.root(), &BTreeMap::new())?;
    Ok(ctx.output.into_bytes())
}

struct ExcC14nContext<'a> {
    doc: &'a Document,
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive_prefixes: BTreeSet<String>,
    output: String,
}

impl<'a> ExcC14nContext<'a> {
    fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |ns| ns.contains_id(id))
    }

    fn process_node(
        &mut self,
        id: NodeId,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let doc = self.doc;
        match doc.node_kind(id) {
            Some(NodeKind::Document) => {
                for child in doc.children(id) {
                    self.process_node(child, rendered_ns)?;
                }
            }
            Some(NodeKind::Element(elem)) => {
                self.process_element(id, elem, rendered_ns)?;
            }
            Some(NodeKind::Text(text)) => {
                if self.is_visible(id) {
                    escape_text_into(text, &mut self.output);
                }
            }
            Some(NodeKind::Comment(text)) => {
                if self.with_comments && self.is_visible(id) {
                    self.top_level_break_before(id);
                    self.output.push_str("<!--");
                    self.output.push_str(text);
                    self.output.push_str("-->");
                    self.top_level_break_after(id);
                }
            }
            Some(NodeKind::ProcessingInstruction(pi)) => {
                if self.is_visible(id) {
                    self.top_level_break_before(id);
                    self.output.push_str("<?");
                    self.output.push_str(&pi.target);
                    if let Some(value) = pi.data.as_deref().filter(|v| !v.is_empty()) {
                        self.output.push(' ');
                        self.output.push_str(&escape_pi(value));
                    }
                    self.output.push_str("?>");
                    self.top_level_break_after(id);
                }
            }
            None => {
                return Err(Error::Canonicalization(format!("unknown node {id:?}")));
            }
        }
        Ok(())
    }

    // Nodes outside the document element are separated from it by a line feed.
    fn top_level_break_before(&mut self, id: NodeId) {
        if self.is_top_level(id) && has_sibling_element(self.doc, id, Direction::Preceding) {
            self.output.push('\n');
        }
    }

    fn top_level_break_after(&mut self, id: NodeId) {
        if self.is_top_level(id) && has_sibling_element(self.doc, id, Direction::Following) {
            self.output.push('\n');
        }
    }

    fn is_top_level(&self, id: NodeId) -> bool {
        self.doc.parent(id) == Some(self.doc.root())
    }

    fn process_element(
        &mut self,
        id: NodeId,
        elem: &Element,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let doc = self.doc;
        if !self.is_visible(id) {
            // Invisible elements render nothing themselves and do not
            // change what their visible descendants inherit.
            for child in doc.children(id) {
                self.process_node(child, rendered_ns)?;
            }
            return Ok(());
        }

        let mut utilized: BTreeSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(elem.name.prefix.clone().unwrap_or_default());
        for attr in &elem.attributes {
            if let Some(prefix) = &attr.name.prefix {
                utilized.insert(prefix.clone());
            }
        }

        let inscope = collect_inscope_namespaces(doc, id);
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            match inscope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // Default namespace went out of scope below a rendered one.
                    if rendered_ns.get("").is_some_and(|u| !u.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {
                    if elem.name.prefix.as_deref() == Some(prefix.as_str()) {
                        return Err(Error::Canonicalization(format!(
                            "unbound prefix '{prefix}' on element {}",
                            elem.name.local_name
                        )));
                    }
                }
            }
        }
        ns_decls.sort();

        let mut attrs: Vec<Attr> = elem
            .attributes
            .iter()
            .map(|a| Attr {
                ns_uri: a.name.namespace().to_owned(),
                local_name: a.name.local_name.clone(),
                qualified_name: a.name.qualified(),
                value: a.value.clone(),
            })
            .collect();
        attrs.sort();

        let elem_name = elem.name.qualified();
        self.output.push('<');
        self.output.push_str(&elem_name);
        for decl in &ns_decls {
            decl.render_into(&mut self.output);
        }
        for attr in &attrs {
            attr.render_into(&mut self.output);
        }
        self.output.push('>');

        let mut child_rendered_ns = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered_ns.insert(decl.prefix, decl.uri);
        }
        for child in doc.children(id) {
            self.process_node(child, &child_rendered_ns)?;
        }

        self.output.push_str("</");
        self.output.push_str(&elem_name);
        self.output.push('>');
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Preceding,
    Following,
}

fn has_sibling_element(doc: &Document, id: NodeId, direction: Direction) -> bool {
    let step = |n: NodeId| match direction {
        Direction::Preceding => doc.previous_sibling(n),
        Direction::Following => doc.next_sibling(n),
    };
    let mut sib = step(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = step(s);
    }
    false
}

/// Collect all in-scope namespaces for an element.
fn collect_inscope_namespaces(doc: &Document, id: NodeId) -> BTreeMap<String, String> {
    let mut chain = Vec::new();
    let mut current = Some(id);
    while let Some(n) = current {
        if let Some(elem) = doc.element(n) {
            chain.push(elem);
        }
        current = doc.parent(n);
    }

    let mut result = BTreeMap::new();
    for elem in chain.into_iter().rev() {
        for (prefix, uri) in &elem.namespace_declarations {
            if uri.is_empty() {
                result.remove(prefix);
            } else {
                result.insert(prefix.clone(), uri.clone());
            }
        }
        // Names created programmatically may carry a namespace without an
        // explicit declaration on any ancestor.
        if let (Some(uri), prefix) = (&elem.name.namespace_uri, &elem.name.prefix) {
            result.insert(prefix.clone().unwrap_or_default(), uri.clone());
        }
    }
    result.remove("xml");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixsig_xml::parse_str;

    fn c14n(xml: &str) -> String {
        let doc = parse_str(xml).unwrap();
        String::from_utf8(canonicalize(&doc, false, None, &[]).unwrap()).unwrap()
    }

    fn c14n_subtree(xml: &str, local: &str) -> String {
        let doc = parse_str(xml).unwrap();
        let id = doc.find_elements_by_local_name(local)[0];
        let set = NodeSet::tree_without_comments(id, &doc);
        String::from_utf8(canonicalize(&doc, false, Some(&set), &[]).unwrap()).unwrap()
    }

    #[test]
    fn test_attribute_order_and_empty_elements() {
        assert_eq!(c14n(r#"<a z="1" b="2"><c/></a>"#), r#"<a b="2" z="1"><c></c></a>"#);
    }

    #[test]
    fn test_unused_namespace_dropped() {
        assert_eq!(
            c14n(r#"<a xmlns:unused="urn:u" xmlns:p="urn:p"><p:b/></a>"#),
            r#"<a><p:b xmlns:p="urn:p"></p:b></a>"#
        );
    }

    #[test]
    fn test_subtree_pulls_inherited_default_namespace() {
        let xml = r#"<Envelope xmlns="urn:env"><AppHdr xmlns="urn:head"><Fr>A</Fr></AppHdr><Document xmlns="urn:doc"><X>1</X></Document></Envelope>"#;
        assert_eq!(
            c14n_subtree(xml, "AppHdr"),
            r#"<AppHdr xmlns="urn:head"><Fr>A</Fr></AppHdr>"#
        );
    }

    #[test]
    fn test_comments_omitted_and_whitespace_kept() {
        assert_eq!(c14n("<a>\n  <!-- note -->\n  <b>x &amp; y</b>\n</a>"), "<a>\n  \n  <b>x &amp; y</b>\n</a>");
    }

    #[test]
    fn test_inclusive_prefix_list() {
        let doc = parse_str(r#"<a xmlns:p="urn:p"><b/></a>"#).unwrap();
        let b = doc.find_element("", "b").unwrap();
        let set = NodeSet::tree_without_comments(b, &doc);
        let out = canonicalize(&doc, false, Some(&set), &["p".to_owned()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"<b xmlns:p="urn:p"></b>"#);
    }

    #[test]
    fn test_attribute_prefix_as_written() {
        assert_eq!(
            c14n(r#"<r xmlns:a="urn:x" xmlns:b="urn:x"><e b:attr="1"/></r>"#),
            r#"<r><e xmlns:b="urn:x" b:attr="1"></e></r>"#
        );
        assert_eq!(
            c14n(r#"<r xmlns:a="urn:x" xmlns:b="urn:x"><e a:attr="1"/></r>"#),
            r#"<r><e xmlns:a="urn:x" a:attr="1"></e></r>"#
        );
    }

    #[test]
    fn test_deepest_loadable_document_canonicalizes() {
        let depth = pixsig_xml::loader::DEFAULT_MAX_DEPTH;
        let xml = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let out = c14n(&xml);
        assert_eq!(out.matches("<a>").count(), depth);
        assert!(out.ends_with("</a>"));
    }
}
