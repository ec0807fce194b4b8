//! Element Tree - Arena-based tree representation
//!
//! Storage layout:
//! - Arena of nodes addressed by `NodeId`
//! - Separate arenas for attributes and namespace declarations
//! - Interned strings for every name, URI, value and text
//!
//! Top-level nodes have no parent and are chained as siblings, so a
//! comment before the root element is simply the root element's
//! previous sibling.

use super::node::{NamespaceDecl, NodeId, NodeKind, TreeNode, XmlAttribute};
use super::strings::StringPool;
use super::TreeAccess;

/// An immutable element tree
#[derive(Debug, Default)]
pub struct ElementTree {
    /// Arena of nodes
    pub(crate) nodes: Vec<TreeNode>,
    /// Arena of attributes
    pub(crate) attributes: Vec<XmlAttribute>,
    /// Arena of namespace declarations
    pub(crate) namespaces: Vec<NamespaceDecl>,
    /// Interned strings
    pub(crate) strings: StringPool,
    /// First top-level node
    pub(crate) first_top: Option<NodeId>,
}

impl ElementTree {
    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id as usize)
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over top-level nodes in document order
    pub fn top_level(&self) -> SiblingIter<'_> {
        SiblingIter { tree: self, next: self.first_top }
    }

    /// First top-level element
    pub fn root_element(&self) -> Option<NodeId> {
        self.top_level().find(|&id| self.nodes[id as usize].kind.is_element())
    }
}

impl TreeAccess for ElementTree {
    #[inline]
    fn contains(&self, id: NodeId) -> bool {
        (id as usize) < self.nodes.len()
    }

    #[inline]
    fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id as usize].kind
    }

    #[inline]
    fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id as usize].first_child
    }

    #[inline]
    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id as usize].next_sibling
    }

    fn local_name(&self, id: NodeId) -> &str {
        self.strings.resolve(self.nodes[id as usize].name_id)
    }

    fn prefix(&self, id: NodeId) -> Option<&str> {
        match self.nodes[id as usize].prefix_id {
            0 => None,
            p => self.strings.get_str(p),
        }
    }

    fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        match self.nodes[id as usize].namespace_id {
            0 => None,
            u => self.strings.get_str(u),
        }
    }

    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        let node = &self.nodes[id as usize];
        let start = node.attr_start as usize;
        self.attributes
            .get(start..start + node.attr_count as usize)
            .unwrap_or(&[])
    }

    fn namespace_declarations(&self, id: NodeId) -> &[NamespaceDecl] {
        let node = &self.nodes[id as usize];
        let start = node.ns_start as usize;
        self.namespaces
            .get(start..start + node.ns_count as usize)
            .unwrap_or(&[])
    }

    fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id as usize].text_id.and_then(|t| self.strings.get_str(t))
    }

    #[inline]
    fn string(&self, id: u32) -> &str {
        self.strings.resolve(id)
    }
}

/// Iterator along a sibling chain
pub struct SiblingIter<'a> {
    tree: &'a ElementTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for SiblingIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MiscKind, TreeBuilder};

    fn sample() -> ElementTree {
        let mut b = TreeBuilder::new();
        b.comment(" lead ");
        b.start_element("root", &[("id", "r")]).unwrap();
        b.leaf_text_element("title", &[], "Hi").unwrap();
        b.start_element("body", &[]).unwrap();
        b.leaf_text_element("p", &[], "").unwrap();
        b.end_element().unwrap();
        b.end_element().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn test_top_level_and_root_element() {
        let tree = sample();
        let top: Vec<_> = tree.top_level().collect();
        assert_eq!(top.len(), 2);
        assert_eq!(tree.kind(top[0]), NodeKind::Misc(MiscKind::Comment));
        assert_eq!(tree.root_element(), Some(top[1]));
        assert_eq!(tree.local_name(top[1]), "root");
        assert_eq!(tree.get_node(top[1]).unwrap().parent, None);
    }

    #[test]
    fn test_text_only_for_leaf_or_misc() {
        let tree = sample();
        let root = tree.root_element().unwrap();
        let title = tree.first_child(root).unwrap();
        assert_eq!(tree.text(title), Some("Hi"));
        assert_eq!(tree.text(root), None);
        assert_eq!(tree.text(tree.top_level().next().unwrap()), Some(" lead "));

        let body = tree.next_sibling(title).unwrap();
        let p = tree.first_child(body).unwrap();
        assert_eq!(tree.kind(p), NodeKind::LeafTextElement);
        assert_eq!(tree.text(p), Some(""));
    }

    #[test]
    fn test_attributes_slice() {
        let tree = sample();
        let root = tree.root_element().unwrap();
        let attrs = tree.attributes(root);
        assert_eq!(attrs.len(), 1);
        assert_eq!(tree.string(attrs[0].name_id), "id");
        assert_eq!(tree.string(attrs[0].value_id), "r");
        assert!(tree.attributes(tree.first_child(root).unwrap()).is_empty());
    }

    #[test]
    fn test_contains() {
        let tree = sample();
        assert!(tree.contains(0));
        assert!(!tree.contains(tree.node_count() as NodeId));
    }
}
