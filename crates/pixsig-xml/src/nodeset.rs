#![forbid(unsafe_code)]

//! NodeSet type for canonicalization and transforms.
//!
//! A `NodeSet` is the set of document nodes selected by a reference URI,
//! narrowed further by transforms such as enveloped-signature.

use crate::document::{Document, NodeId, NodeKind};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<usize>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// All nodes in the document except comments.
    /// `URI=""` selects the document without comments.
    pub fn all_without_comments(doc: &Document) -> Self {
        let mut set = Self::new();
        collect_subtree(doc.root(), doc, &mut set.nodes);
        set
    }

    /// The subtree rooted at the given node, without comments.
    pub fn tree_without_comments(root_id: NodeId, doc: &Document) -> Self {
        let mut set = Self::new();
        collect_subtree(root_id, doc, &mut set.nodes);
        set
    }

    /// Check if a node is in this set.
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id.index())
    }

    /// Remove a node from this set.
    pub fn remove_id(&mut self, id: NodeId) {
        self.nodes.remove(&id.index());
    }

    /// Remove a node and everything below it.
    pub fn remove_subtree(&mut self, id: NodeId, doc: &Document) {
        self.remove_id(id);
        for d in doc.iter_descendants(id) {
            self.remove_id(d);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn collect_subtree(id: NodeId, doc: &Document, set: &mut HashSet<usize>) {
    for n in std::iter::once(id).chain(doc.iter_descendants(id)) {
        if !matches!(doc.node_kind(n), Some(NodeKind::Comment(_))) {
            set.insert(n.index());
        }
    }
}
