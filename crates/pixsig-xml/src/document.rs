#![forbid(unsafe_code)]

//! Owned, mutable XML tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`].  Detached
//! subtrees stay in the arena but are no longer reachable from the
//! document node, so every traversal starts from [`Document::root`].

use pixsig_core::{ns, Error};

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The arena index of this node.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A possibly prefixed, possibly namespaced name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace_uri: Option<String>,
}

impl QName {
    /// A name with no namespace.
    pub fn local(local_name: &str) -> Self {
        Self {
            prefix: None,
            local_name: local_name.to_owned(),
            namespace_uri: None,
        }
    }

    /// A namespaced name; an empty prefix means the default namespace.
    pub fn namespaced(prefix: &str, local_name: &str, namespace_uri: &str) -> Self {
        Self {
            prefix: (!prefix.is_empty()).then(|| prefix.to_owned()),
            local_name: local_name.to_owned(),
            namespace_uri: (!namespace_uri.is_empty()).then(|| namespace_uri.to_owned()),
        }
    }

    /// `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace_uri.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element, as `(prefix, uri)`.
    /// The default namespace uses an empty prefix; an empty uri undeclares it.
    pub namespace_declarations: Vec<(String, String)>,
}

impl Element {
    fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
        }
    }

    /// Value of an un-namespaced attribute.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace_uri.is_none() && a.name.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn local_name(&self) -> &str {
        &self.name.local_name
    }

    pub fn namespace(&self) -> &str {
        self.name.namespace()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInstruction {
    pub target: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction(ProcessingInstruction),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    /// Position in the parent's `children`; meaningless while detached.
    position: usize,
    children: Vec<NodeId>,
}

/// An owned XML document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Create a document holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                position: 0,
                children: Vec::new(),
            }],
        }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The top-level element, if any.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root()).find(|c| self.element(*c).is_some())
    }

    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node_kind(id) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id.0)
            .into_iter()
            .flat_map(|n| n.children.iter().copied())
    }

    /// Element children only.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|c| self.element(*c).is_some())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        let siblings = &self.nodes.get(node.parent?.0)?.children;
        node.position.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        let siblings = &self.nodes.get(node.parent?.0)?.children;
        siblings.get(node.position + 1).copied()
    }

    /// Nodes below `id` in document order, excluding `id` itself.
    pub fn iter_descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.iter_descendants(id).collect()
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in std::iter::once(id).chain(self.iter_descendants(id)) {
            if let Some(NodeKind::Text(t)) = self.node_kind(n) {
                out.push_str(t);
            }
        }
        out
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// First element in document order with the given namespace and local name.
    pub fn find_element(&self, ns: &str, local_name: &str) -> Option<NodeId> {
        self.iter_descendants(self.root()).find(|id| {
            self.element(*id)
                .is_some_and(|e| e.local_name() == local_name && e.namespace() == ns)
        })
    }

    /// All elements with the given namespace and local name.
    pub fn find_elements(&self, ns: &str, local_name: &str) -> Vec<NodeId> {
        self.iter_descendants(self.root())
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|e| e.local_name() == local_name && e.namespace() == ns)
            })
            .collect()
    }

    /// All elements with the given local name, in any namespace.
    pub fn find_elements_by_local_name(&self, local_name: &str) -> Vec<NodeId> {
        self.iter_descendants(self.root())
            .filter(|id| self.element(*id).is_some_and(|e| e.local_name() == local_name))
            .collect()
    }

    /// First child element of `parent` with the given namespace and local name.
    pub fn find_child_element(&self, parent: NodeId, ns: &str, local_name: &str) -> Option<NodeId> {
        self.child_elements(parent).find(|c| {
            self.element(*c)
                .is_some_and(|e| e.local_name() == local_name && e.namespace() == ns)
        })
    }

    /// First element in document order whose `Id`, `ID` or `id` attribute
    /// equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let id_attrs = [ns::attr::ID, "ID", "id"];
        self.iter_descendants(self.root()).find(|n| {
            self.element(*n)
                .is_some_and(|e| id_attrs.iter().any(|a| e.attribute(a) == Some(id)))
        })
    }

    // ── Mutation ─────────────────────────────────────────────────────

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            position: 0,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_owned()))
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    /// if it is attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if parent.0 >= self.nodes.len() || child.0 >= self.nodes.len() {
            return Err(Error::Other(format!("unknown node {child:?} or {parent:?}")));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::Other("cannot append a node below itself".into()));
        }
        if matches!(self.nodes[parent.0].kind, NodeKind::Text(_) | NodeKind::Comment(_)) {
            return Err(Error::Other("text and comment nodes cannot have children".into()));
        }
        self.detach(child);
        let position = self.nodes[parent.0].children.len();
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].position = position;
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: QName) -> Result<NodeId, Error> {
        let id = self.create_element(name);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Replace the children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        let old: Vec<NodeId> = self.children(id).collect();
        for child in old {
            self.detach(child);
        }
        let text_id = self.create_text(text);
        self.append_child(id, text_id)
    }

    /// Set (or replace) an un-namespaced attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), Error> {
        let elem = self
            .element_mut(id)
            .ok_or_else(|| Error::Other(format!("node {id:?} is not an element")))?;
        match elem
            .attributes
            .iter_mut()
            .find(|a| a.name.namespace_uri.is_none() && a.name.local_name == name)
        {
            Some(attr) => attr.value = value.to_owned(),
            None => elem.attributes.push(Attribute {
                name: QName::local(name),
                value: value.to_owned(),
            }),
        }
        Ok(())
    }

    /// Declare a namespace on an element.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, uri: &str) -> Result<(), Error> {
        let elem = self
            .element_mut(id)
            .ok_or_else(|| Error::Other(format!("node {id:?} is not an element")))?;
        elem.namespace_declarations.retain(|(p, _)| p != prefix);
        elem.namespace_declarations
            .push((prefix.to_owned(), uri.to_owned()));
        Ok(())
    }

    /// Remove a node and its subtree from the tree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), Error> {
        if id == self.root() || id.0 >= self.nodes.len() {
            return Err(Error::Other(format!("cannot remove node {id:?}")));
        }
        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        let Some(parent) = node.parent.take() else {
            return;
        };
        let position = node.position;
        let siblings = &mut self.nodes[parent.0].children;
        if siblings.get(position) != Some(&id) {
            return;
        }
        siblings.remove(position);
        let following: Vec<NodeId> = siblings[position..].to_vec();
        for (offset, sibling) in following.into_iter().enumerate() {
            self.nodes[sibling.0].position = position + offset;
        }
    }
}

/// Depth-first iterator returned by [`Document::iter_descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let n = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(self.doc.children(n));
        self.stack[start..].reverse();
        Some(n)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
